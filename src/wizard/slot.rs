use serde::Serialize;

use crate::models::{MigrationCreatePayload, ModsValidationResult, SourceKind, WorldValidationResult};

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SelectedSource {
    pub path: String,
    pub kind: SourceKind,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    World,
    Mods,
}

/// State of one source category. A new selection replaces the whole value.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceSlot<T> {
    Empty,
    Validating { source: SelectedSource, ticket: u64 },
    Ready { source: SelectedSource, result: T },
    Failed { source: SelectedSource, message: String },
}

impl<T> Default for SourceSlot<T> {
    fn default() -> Self {
        SourceSlot::Empty
    }
}

impl<T> SourceSlot<T> {
    pub fn source(&self) -> Option<&SelectedSource> {
        match self {
            SourceSlot::Empty => None,
            SourceSlot::Validating { source, .. }
            | SourceSlot::Ready { source, .. }
            | SourceSlot::Failed { source, .. } => Some(source),
        }
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            SourceSlot::Ready { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SourceSlot::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_validating(&self) -> bool {
        matches!(self, SourceSlot::Validating { .. })
    }

    pub(crate) fn is_current(&self, seq: u64) -> bool {
        matches!(self, SourceSlot::Validating { ticket, .. } if *ticket == seq)
    }
}

/// Results that may point at a backend-side working copy.
pub trait Staged {
    fn staged_path(&self) -> Option<&str>;
}

impl Staged for WorldValidationResult {
    fn staged_path(&self) -> Option<&str> {
        self.staged_path.as_deref()
    }
}

impl Staged for ModsValidationResult {
    fn staged_path(&self) -> Option<&str> {
        self.staged_path.as_deref()
    }
}

impl<T: Staged> SourceSlot<T> {
    pub(crate) fn staged_path(&self) -> Option<String> {
        self.result()
            .and_then(|result| result.staged_path())
            .map(str::to_string)
    }
}

/// Handed out when a validation starts; the completion is applied only while
/// the ticket is still the newest one for its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    pub session: u64,
    pub seq: u64,
    pub category: SourceCategory,
    pub source: SelectedSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTicket {
    pub session: u64,
    pub payload: MigrationCreatePayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Superseded by a newer selection or the session ended.
    Stale,
}
