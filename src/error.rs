use thiserror::Error;

/// Main error type for the spread model
#[derive(Error, Debug)]
pub enum LinesmithError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Malformed configuration table: {0}")]
    Configuration(String),

    // Lookup errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    // State machine errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid transition for {id}: from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    // Input errors
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinesmithError {
    pub fn team_not_found(id: impl ToString) -> Self {
        LinesmithError::NotFound {
            entity: "Team",
            id: id.to_string(),
        }
    }

    pub fn bet_not_found(id: impl ToString) -> Self {
        LinesmithError::NotFound {
            entity: "Bet record",
            id: id.to_string(),
        }
    }

    /// Identifier of the entity the failure concerns, when there is one.
    pub fn failing_id(&self) -> Option<&str> {
        match self {
            LinesmithError::NotFound { id, .. } => Some(id),
            LinesmithError::InvalidTransition { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Result type alias for LinesmithError
pub type Result<T> = std::result::Result<T, LinesmithError>;
