use crate::constants::DEFAULT_GHOST_EPSILON;
use crate::error::GameError;

/// Extracts the session id from an `Authorization: Bearer <id>` header.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

pub fn normalize_epsilon(value: Option<f32>) -> f32 {
    match value {
        Some(epsilon) if epsilon.is_finite() => epsilon.clamp(0.0, 1.0),
        _ => DEFAULT_GHOST_EPSILON,
    }
}

/// HTTP status for a rejected request.
pub fn status_for_error(err: &GameError) -> u16 {
    match err {
        GameError::ImpersonationRejected(_) => 403,
        GameError::RoleAlreadyConnected(_) | GameError::RoundEnded => 409,
        GameError::MalformedTemplate(_) | GameError::OutOfBounds { .. } => 500,
        GameError::UnknownDirection(_)
        | GameError::MalformedPayload(_)
        | GameError::UnknownRole(_)
        | GameError::RoleNotConnected(_)
        | GameError::WrongArity { .. } => 400,
    }
}
