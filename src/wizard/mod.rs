mod controller;
mod slot;
mod state;

use serde::{Deserialize, Serialize};

pub use controller::MigrationController;
pub use slot::{
    Completion, CreateTicket, SelectedSource, SourceCategory, SourceSlot, Staged, ValidationTicket,
};
pub use state::{MigrationSummary, MigrationWizard, ServerDraft, SessionStatus, DEFAULT_SERVER_NAME};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Hosting,
    Instructions,
    WorldImport,
    DetectionAndMods,
    Configure,
    Summary,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::Hosting,
        WizardStep::Instructions,
        WizardStep::WorldImport,
        WizardStep::DetectionAndMods,
        WizardStep::Configure,
        WizardStep::Summary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<WizardStep> {
        WizardStep::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|index| WizardStep::ALL[index])
    }
}

/// Who owns a group of pre-filled fields.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldMode {
    #[default]
    Auto,
    UserOverridden,
}
