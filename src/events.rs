use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::WorldCopyProgress;
use crate::wizard::WizardStep;

pub const STEP_EVENT: &str = "wizard:step";
pub const WORLD_COPY_EVENT: &str = "world:copy";
pub const CLOSED_EVENT: &str = "wizard:closed";

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    Cancelled,
    Created { server_name: String },
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum WizardEvent {
    StepChanged { step: WizardStep },
    WorldCopy(WorldCopyProgress),
    /// The host should close the wizard.
    Closed { reason: CloseReason },
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WizardEvent::StepChanged { .. } => STEP_EVENT,
            WizardEvent::WorldCopy(_) => WORLD_COPY_EVENT,
            WizardEvent::Closed { .. } => CLOSED_EVENT,
        }
    }
}

/// Named event stream towards the host UI.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: WizardEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn emit(&self, _event: WizardEvent) {}
}

impl EventEmitter for UnboundedSender<WizardEvent> {
    fn emit(&self, event: WizardEvent) {
        // receiver gone means nobody is listening anymore
        let _ = self.send(event);
    }
}
