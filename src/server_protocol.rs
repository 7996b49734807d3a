use serde_json::Value;

use crate::error::GameError;
use crate::round::MoveRequest;
use crate::types::{Direction, Role};

/// Parses a move body for `role`.
///
/// Player: `"up"` or `{"dir": "up"}`.
/// Ghost: `["up", "left", ...]` or `{"dirs": [...]}`.
pub fn parse_move_request(role: Role, raw: &str) -> Result<MoveRequest, GameError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| GameError::MalformedPayload(format!("invalid json: {err}")))?;

    match role {
        Role::Player => {
            let token = match &value {
                Value::String(token) => token.as_str(),
                Value::Object(object) => object
                    .get("dir")
                    .and_then(Value::as_str)
                    .ok_or_else(|| GameError::MalformedPayload("missing \"dir\"".to_string()))?,
                _ => {
                    return Err(GameError::MalformedPayload(
                        "expected a direction".to_string(),
                    ))
                }
            };
            Ok(MoveRequest::Player(Direction::parse_move(token)?))
        }
        Role::Ghost => {
            let items = match &value {
                Value::Array(items) => items,
                Value::Object(object) => object
                    .get("dirs")
                    .and_then(Value::as_array)
                    .ok_or_else(|| GameError::MalformedPayload("missing \"dirs\"".to_string()))?,
                _ => {
                    return Err(GameError::MalformedPayload(
                        "expected a list of directions".to_string(),
                    ))
                }
            };
            let dirs = items
                .iter()
                .map(|item| {
                    let token = item.as_str().ok_or_else(|| {
                        GameError::MalformedPayload("direction must be a string".to_string())
                    })?;
                    Direction::parse_move(token)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(MoveRequest::Ghosts(dirs))
        }
    }
}
