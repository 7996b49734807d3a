use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("malformed board template: {0}")]
    MalformedTemplate(String),

    #[error("cell ({row}, {col}) is outside the grid")]
    OutOfBounds { row: i32, col: i32 },

    #[error("unknown direction: {0:?}")]
    UnknownDirection(String),

    #[error("malformed move payload: {0}")]
    MalformedPayload(String),

    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    #[error("session does not hold the {0} role")]
    ImpersonationRejected(Role),

    #[error("{0} is not connected")]
    RoleNotConnected(Role),

    #[error("{0} is already connected")]
    RoleAlreadyConnected(Role),

    #[error("expected {expected} ghost moves, got {got}")]
    WrongArity { expected: usize, got: usize },

    #[error("round has ended")]
    RoundEnded,
}
