use thiserror::Error;

use crate::wizard::WizardStep;

/// Failures coming back from the backend or from local configuration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A world or mods source could not be used.
    #[error("{message}")]
    Validation { message: String },

    /// Server materialisation failed; nothing was registered.
    #[error("{message}")]
    Creation { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl MigrationError {
    pub fn validation(message: impl Into<String>) -> Self {
        MigrationError::Validation {
            message: message.into(),
        }
    }

    pub fn creation(message: impl Into<String>) -> Self {
        MigrationError::Creation {
            message: message.into(),
        }
    }
}

/// Misuse of the wizard state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Cannot continue from {step:?}: {reason}")]
    StepBlocked { step: WizardStep, reason: String },

    #[error("The migration session has already ended")]
    SessionClosed,

    #[error("Another operation is still running")]
    Busy,

    #[error("Server creation is only available on the summary step")]
    NotAtSummary,

    #[error("{0} GB is not one of the offered RAM options")]
    InvalidRam(u32),

    #[error("Nothing was dropped")]
    NothingDropped,

    #[error("Failed to lock wizard state")]
    StateLock,
}
