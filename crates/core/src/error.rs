use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The message meant for the person at the keyboard, without the
    /// category prefix used by `Display`.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::NotFound { entity, id } => format!("{entity} {id} no longer exists"),
            CoreError::Validation(msg) | CoreError::Conflict(msg) | CoreError::Internal(msg) => {
                msg.clone()
            }
        }
    }
}
