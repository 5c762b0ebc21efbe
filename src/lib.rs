pub mod backend;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod ram;
pub mod source;
pub mod validator;
pub mod wizard;

pub use backend::LocalBackend;
pub use config::{AppPaths, JsonPreferencesStore, MigrationConfig, MigrationPreferences, PreferencesStore};
pub use error::{MigrationError, WizardError};
pub use events::{CloseReason, EventEmitter, NullEmitter, WizardEvent};
pub use validator::MigrationBackend;
pub use wizard::{MigrationController, MigrationWizard, WizardStep};
