use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::slot::{Completion, ValidationTicket};
use super::state::MigrationWizard;
use super::WizardStep;
use crate::config::{MigrationConfig, MigrationPreferences, PreferencesStore};
use crate::error::WizardError;
use crate::events::{CloseReason, EventEmitter, WizardEvent};
use crate::models::{HostingSource, ServerConfig, ServerType};
use crate::validator::{MigrationBackend, ModsValidatorClient, WorldValidatorClient};

/// Drives a [`MigrationWizard`] against a backend.
///
/// The wizard lock is only held between awaits, so a cancel or a newer
/// selection always goes through while a backend call is pending.
#[derive(Clone)]
pub struct MigrationController {
    wizard: Arc<Mutex<MigrationWizard>>,
    backend: Arc<dyn MigrationBackend>,
    world_validator: WorldValidatorClient,
    mods_validator: ModsValidatorClient,
    events: Arc<dyn EventEmitter>,
    preferences: Option<Arc<dyn PreferencesStore>>,
}

impl MigrationController {
    pub async fn open(
        backend: Arc<dyn MigrationBackend>,
        events: Arc<dyn EventEmitter>,
        config: MigrationConfig,
        preferences: Option<Arc<dyn PreferencesStore>>,
    ) -> Self {
        let mut wizard = MigrationWizard::new(config);
        if let Some(hosting) = preferences
            .as_ref()
            .and_then(|store| store.load().last_hosting)
        {
            // fresh session, cannot be closed yet
            let _ = wizard.choose_hosting(hosting);
        }
        wizard.set_system_ram(backend.system_ram_gb().await);
        info!(
            session = wizard.session(),
            system_ram_gb = ?wizard.system_ram_gb(),
            "migration wizard opened"
        );
        events.emit(WizardEvent::StepChanged {
            step: WizardStep::Hosting,
        });

        Self {
            wizard: Arc::new(Mutex::new(wizard)),
            world_validator: WorldValidatorClient::new(backend.clone()),
            mods_validator: ModsValidatorClient::new(backend.clone()),
            backend,
            events,
            preferences,
        }
    }

    /// Copy of the current wizard state for rendering.
    pub fn snapshot(&self) -> Result<MigrationWizard, WizardError> {
        self.with_wizard(|wizard| wizard.clone())
    }

    pub fn choose_hosting(&self, hosting: HostingSource) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.choose_hosting(hosting))?
    }

    pub fn next(&self) -> Result<WizardStep, WizardError> {
        let step = self.with_wizard(|wizard| wizard.next())??;
        self.events.emit(WizardEvent::StepChanged { step });
        Ok(step)
    }

    pub fn back(&self) -> Result<WizardStep, WizardError> {
        let step = self.with_wizard(|wizard| wizard.back())??;
        self.events.emit(WizardEvent::StepChanged { step });
        Ok(step)
    }

    pub async fn select_world_source(&self, path: &str) -> Result<Completion, WizardError> {
        let ticket = self.with_wizard(|wizard| wizard.begin_world_selection(path))??;
        self.release_staged().await;

        let outcome = self
            .world_validator
            .validate(&ticket.source.path, ticket.source.kind)
            .await;

        let completion =
            self.with_wizard(|wizard| wizard.complete_world_validation(&ticket, outcome))?;
        self.release_staged().await;
        Ok(completion)
    }

    pub async fn select_mods_source(&self, path: &str) -> Result<Completion, WizardError> {
        let ticket = self.with_wizard(|wizard| wizard.begin_mods_selection(path))??;
        self.validate_mods(ticket).await
    }

    pub async fn drop_mods_source<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<Completion, WizardError> {
        let ticket = self.with_wizard(|wizard| wizard.drop_mods_source(paths))??;
        self.validate_mods(ticket).await
    }

    pub async fn clear_mods(&self) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.clear_mods())??;
        self.release_staged().await;
        Ok(())
    }

    pub fn set_server_name(&self, name: &str) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.set_server_name(name))?
    }

    pub fn set_server_type(&self, server_type: ServerType) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.set_server_type(server_type))?
    }

    pub fn set_server_version(&self, version: &str) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.set_server_version(version))?
    }

    pub fn set_online_mode(&self, online_mode: bool) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.set_online_mode(online_mode))?
    }

    pub fn select_ram(&self, ram_gb: u32) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.select_ram(ram_gb))?
    }

    pub fn use_recommended_ram(&self) -> Result<(), WizardError> {
        self.with_wizard(|wizard| wizard.use_recommended_ram())?
    }

    /// Submits the Summary step.
    ///
    /// `Ok(None)` means the wizard stays open: either the backend refused
    /// (see `create_error`) or the session was cancelled meanwhile.
    pub async fn create(&self) -> Result<Option<ServerConfig>, WizardError> {
        let (ticket, hosting) = self.with_wizard(|wizard| {
            wizard
                .begin_create()
                .map(|ticket| (ticket, wizard.hosting()))
        })??;

        let outcome = self.backend.create_server(&ticket.payload).await;
        if let Err(err) = &outcome {
            warn!(name = %ticket.payload.name, "backend refused server creation: {}", err);
        }

        let created = self.with_wizard(|wizard| {
            match wizard.complete_create(&ticket, outcome) {
                Completion::Applied => wizard.created().cloned(),
                Completion::Stale => None,
            }
        })?;

        if let Some(server) = &created {
            self.remember(hosting);
            self.events.emit(WizardEvent::Closed {
                reason: CloseReason::Created {
                    server_name: server.name.clone(),
                },
            });
        }
        Ok(created)
    }

    /// Ends the session at once; anything still in flight is dropped when it
    /// lands.
    pub async fn cancel(&self) -> Result<bool, WizardError> {
        let cancelled = self.with_wizard(|wizard| wizard.cancel())?;
        if cancelled {
            self.events.emit(WizardEvent::Closed {
                reason: CloseReason::Cancelled,
            });
        }
        self.release_staged().await;
        Ok(cancelled)
    }

    async fn validate_mods(&self, ticket: ValidationTicket) -> Result<Completion, WizardError> {
        self.release_staged().await;

        let outcome = self
            .mods_validator
            .validate(&ticket.source.path, ticket.source.kind)
            .await;

        let completion =
            self.with_wizard(|wizard| wizard.complete_mods_validation(&ticket, outcome))?;
        self.release_staged().await;
        Ok(completion)
    }

    async fn release_staged(&self) {
        let released = match self.with_wizard(|wizard| wizard.take_released_staged()) {
            Ok(released) => released,
            Err(err) => {
                warn!("could not collect released staging folders: {}", err);
                return;
            }
        };
        for staged in released {
            self.backend.release_staged(&staged).await;
        }
    }

    fn remember(&self, hosting: Option<HostingSource>) {
        let Some(store) = &self.preferences else {
            return;
        };
        let preferences = MigrationPreferences {
            last_hosting: hosting,
        };
        if let Err(err) = store.save(&preferences) {
            warn!("failed to save migration preferences: {}", err);
        }
    }

    fn with_wizard<R>(&self, f: impl FnOnce(&mut MigrationWizard) -> R) -> Result<R, WizardError> {
        let mut wizard = self.wizard.lock().map_err(|_| WizardError::StateLock)?;
        Ok(f(&mut wizard))
    }
}
