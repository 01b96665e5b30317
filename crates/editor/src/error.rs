use poultry_core::error::CoreError;

use crate::gateway::GatewayError;

/// Shown when a reload fails without a backend message.
pub const RELOAD_FALLBACK_MESSAGE: &str = "The shipments could not be loaded.";

/// Error type of every editor command.
///
/// Wraps [`CoreError`] for local rule violations (raised before anything is
/// sent) and [`GatewayError`] for failed backend requests.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// A local rule was violated; no request was made.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend rejected a request or could not be reached.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The write went through but fetching the table afterwards failed.
    /// Local edits are already discarded; retrying the write would repeat
    /// it.
    #[error("Saved, but reloading failed: {0}")]
    Reload(#[source] GatewayError),

    /// The delete confirmation does not match the row it was issued for.
    #[error("Delete confirmation is stale: {0}")]
    StaleConfirmation(String),
}

/// Convenience type alias for editor command results.
pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    /// Text for the notification shown after a failed command.
    pub fn user_message(&self) -> String {
        match self {
            EditorError::Core(core) => core.user_message(),
            EditorError::Gateway(gateway) => gateway.user_message(),
            EditorError::Reload(gateway) => format!(
                "Changes were saved, but the table could not be reloaded: {}",
                gateway.message_or(RELOAD_FALLBACK_MESSAGE)
            ),
            EditorError::StaleConfirmation(msg) => msg.clone(),
        }
    }

    /// Whether the failure happened before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, EditorError::Core(_) | EditorError::StaleConfirmation(_))
    }
}

/// Invalid report configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to read fixture {path}: {source}")]
    FixtureRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fixture {path}: {source}")]
    FixtureParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_are_local() {
        let err = EditorError::from(CoreError::Validation("The delivery code is required.".into()));
        assert!(err.is_local());
        assert_eq!(err.user_message(), "The delivery code is required.");
    }

    #[test]
    fn gateway_errors_use_backend_text() {
        let err = EditorError::from(GatewayError::new(400, "Bad code"));
        assert!(!err.is_local());
        assert_eq!(err.user_message(), "Bad code");
    }

    #[test]
    fn reload_failures_say_the_write_went_through() {
        let err = EditorError::Reload(GatewayError::status(503));
        assert!(!err.is_local());
        assert_eq!(
            err.user_message(),
            "Changes were saved, but the table could not be reloaded: The shipments could not be loaded."
        );
    }
}
