use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::slot::{
    Completion, CreateTicket, SelectedSource, SourceCategory, SourceSlot, Staged, ValidationTicket,
};
use super::{FieldMode, WizardStep};
use crate::config::MigrationConfig;
use crate::detection::{compare_world_to_mods, detect_profile};
use crate::error::{MigrationError, WizardError};
use crate::models::{
    DetectedPack, HostingSource, MigrationCreatePayload, MigrationDetection, ModComparison,
    ModsImportPayload, ModsValidationResult, ServerConfig, ServerType, SourceKind,
    WorldImportPayload, WorldValidationResult,
};
use crate::ram::{ram_options, safe_max_ram_gb_with, suggest_ram_gb_with};
use crate::source::classify;

pub const DEFAULT_SERVER_NAME: &str = "Migrated World";

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Cancelled,
    Completed,
}

/// Values that end up in the creation payload.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ServerDraft {
    pub name: String,
    pub server_type: ServerType,
    pub version: String,
    pub ram_gb: u32,
    pub online_mode: bool,
    pub port: u16,
}

impl ServerDraft {
    fn from_config(config: &MigrationConfig) -> Self {
        Self {
            name: String::new(),
            server_type: ServerType::Vanilla,
            version: String::new(),
            ram_gb: config.fallback_ram_gb,
            online_mode: config.default_online_mode,
            port: config.default_port,
        }
    }
}

/// Everything a session accumulates; replaced as a whole on cancel or success.
#[derive(Debug, Clone)]
struct WorkingState {
    step: WizardStep,
    hosting: Option<HostingSource>,
    world: SourceSlot<WorldValidationResult>,
    mods: SourceSlot<ModsValidationResult>,
    draft: ServerDraft,
    config_mode: FieldMode,
    ram_mode: FieldMode,
    creating: bool,
    create_error: Option<String>,
}

impl WorkingState {
    fn new(config: &MigrationConfig) -> Self {
        Self {
            step: WizardStep::Hosting,
            hosting: None,
            world: SourceSlot::Empty,
            mods: SourceSlot::Empty,
            draft: ServerDraft::from_config(config),
            config_mode: FieldMode::Auto,
            ram_mode: FieldMode::Auto,
            creating: false,
            create_error: None,
        }
    }
}

/// Read model for the Summary step.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MigrationSummary {
    pub hosting: Option<HostingSource>,
    pub world_name: String,
    pub world_source_kind: SourceKind,
    pub world_size_bytes: u64,
    pub detection: Option<MigrationDetection>,
    pub mod_count: Option<usize>,
    pub detected_pack: Option<DetectedPack>,
    pub comparison: ModComparison,
    pub draft: ServerDraft,
    pub ram_mode: FieldMode,
}

/// The migration wizard: six gated steps ending in a creation request.
///
/// Backend calls are split in two halves. `begin_*` records what was asked and
/// hands out a ticket; `complete_*` applies the answer only if that ticket is
/// still the newest one and the session is still open.
#[derive(Debug, Clone)]
pub struct MigrationWizard {
    session: u64,
    status: SessionStatus,
    config: MigrationConfig,
    system_ram_gb: Option<u32>,
    next_seq: u64,
    working: WorkingState,
    created: Option<ServerConfig>,
    released: Vec<String>,
}

impl MigrationWizard {
    pub fn new(config: MigrationConfig) -> Self {
        let working = WorkingState::new(&config);
        Self {
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            status: SessionStatus::Active,
            config,
            system_ram_gb: None,
            next_seq: 1,
            working,
            created: None,
            released: Vec::new(),
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn step(&self) -> WizardStep {
        self.working.step
    }

    pub fn hosting(&self) -> Option<HostingSource> {
        self.working.hosting
    }

    pub fn world(&self) -> &SourceSlot<WorldValidationResult> {
        &self.working.world
    }

    pub fn mods(&self) -> &SourceSlot<ModsValidationResult> {
        &self.working.mods
    }

    pub fn world_result(&self) -> Option<&WorldValidationResult> {
        self.working.world.result()
    }

    pub fn mods_result(&self) -> Option<&ModsValidationResult> {
        self.working.mods.result()
    }

    pub fn world_error(&self) -> Option<&str> {
        self.working.world.error()
    }

    pub fn mods_error(&self) -> Option<&str> {
        self.working.mods.error()
    }

    pub fn draft(&self) -> &ServerDraft {
        &self.working.draft
    }

    pub fn config_mode(&self) -> FieldMode {
        self.working.config_mode
    }

    pub fn ram_mode(&self) -> FieldMode {
        self.working.ram_mode
    }

    pub fn is_creating(&self) -> bool {
        self.working.creating
    }

    pub fn create_error(&self) -> Option<&str> {
        self.working.create_error.as_deref()
    }

    pub fn created(&self) -> Option<&ServerConfig> {
        self.created.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.working.creating
            || self.working.world.is_validating()
            || self.working.mods.is_validating()
    }

    pub fn system_ram_gb(&self) -> Option<u32> {
        self.system_ram_gb
    }

    pub fn world_is_valid(&self) -> bool {
        self.world_result().is_some_and(|world| world.valid)
    }

    pub fn detection(&self) -> Option<MigrationDetection> {
        detect_profile(self.world_result())
    }

    pub fn comparison(&self) -> ModComparison {
        compare_world_to_mods(self.world_result(), self.mods_result())
    }

    pub fn safe_max_gb(&self) -> Option<u32> {
        self.system_ram_gb
            .map(|system| safe_max_ram_gb_with(&self.config.ram, system))
    }

    pub fn ram_options(&self) -> Vec<u32> {
        match self.safe_max_gb() {
            Some(max) => ram_options(max),
            None => ram_options(self.config.fallback_ram_gb),
        }
    }

    pub fn recommended_ram_gb(&self) -> Option<u32> {
        suggest_ram_gb_with(
            &self.config.ram,
            self.system_ram_gb,
            self.safe_max_gb().unwrap_or(0),
            self.world_result(),
            self.mods_result(),
        )
    }

    /// Staged copies that are no longer referenced, for the backend to drop.
    pub fn take_released_staged(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released)
    }

    pub fn set_system_ram(&mut self, system_ram_gb: Option<u32>) {
        self.system_ram_gb = system_ram_gb;
        self.refresh_ram();
    }

    pub fn choose_hosting(&mut self, hosting: HostingSource) -> Result<(), WizardError> {
        self.ensure_active()?;
        self.working.hosting = Some(hosting);
        Ok(())
    }

    pub fn can_advance(&self) -> bool {
        self.is_active() && self.gate(self.working.step).is_ok()
    }

    /// Why the current step cannot be left, if it cannot.
    pub fn blocked_reason(&self) -> Option<String> {
        if !self.is_active() {
            return Some(WizardError::SessionClosed.to_string());
        }
        self.gate(self.working.step).err()
    }

    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_active()?;
        let step = self.working.step;
        self.gate(step)
            .map_err(|reason| WizardError::StepBlocked { step, reason })?;
        let next = step.next().ok_or_else(|| WizardError::StepBlocked {
            step,
            reason: "This is the last step.".to_string(),
        })?;

        self.working.step = next;
        if matches!(next, WizardStep::DetectionAndMods | WizardStep::Configure) {
            self.auto_fill();
        }
        info!(from = ?step, to = ?next, "migration wizard advanced");
        Ok(next)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_active()?;
        if self.working.creating {
            return Err(WizardError::Busy);
        }
        if let Some(previous) = self.working.step.previous() {
            self.working.step = previous;
        }
        Ok(self.working.step)
    }

    pub fn begin_world_selection(&mut self, path: &str) -> Result<ValidationTicket, WizardError> {
        self.ensure_active()?;
        if self.working.creating {
            return Err(WizardError::Busy);
        }
        let source = select(path);
        let seq = self.bump_seq();
        if let Some(staged) = self.working.world.staged_path() {
            self.released.push(staged);
        }
        self.working.world = SourceSlot::Validating {
            source: source.clone(),
            ticket: seq,
        };
        self.refresh_ram();
        info!(path = %source.path, kind = source.kind.as_str(), "world source selected");
        Ok(ValidationTicket {
            session: self.session,
            seq,
            category: SourceCategory::World,
            source,
        })
    }

    pub fn complete_world_validation(
        &mut self,
        ticket: &ValidationTicket,
        outcome: Result<WorldValidationResult, MigrationError>,
    ) -> Completion {
        if !self.accepts(ticket, SourceCategory::World) {
            self.discard_stale(ticket, outcome.ok().as_ref());
            return Completion::Stale;
        }

        let source = ticket.source.clone();
        self.working.world = match outcome {
            Ok(result) if result.valid => SourceSlot::Ready { source, result },
            Ok(result) => {
                if let Some(staged) = result.staged_path() {
                    self.released.push(staged.to_string());
                }
                SourceSlot::Failed {
                    source,
                    message: "The selected source is not a valid Minecraft world.".to_string(),
                }
            }
            Err(err) => SourceSlot::Failed {
                source,
                message: err.to_string(),
            },
        };

        if self.world_is_valid() {
            self.auto_fill();
        } else {
            self.refresh_ram();
        }
        Completion::Applied
    }

    pub fn begin_mods_selection(&mut self, path: &str) -> Result<ValidationTicket, WizardError> {
        self.ensure_active()?;
        if self.working.creating {
            return Err(WizardError::Busy);
        }
        let source = select(path);
        let seq = self.bump_seq();
        if let Some(staged) = self.working.mods.staged_path() {
            self.released.push(staged);
        }
        self.working.mods = SourceSlot::Validating {
            source: source.clone(),
            ticket: seq,
        };
        self.refresh_ram();
        info!(path = %source.path, kind = source.kind.as_str(), "mods source selected");
        Ok(ValidationTicket {
            session: self.session,
            seq,
            category: SourceCategory::Mods,
            source,
        })
    }

    /// Drag-and-drop entry point; uses the first dropped item.
    pub fn drop_mods_source<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<ValidationTicket, WizardError> {
        let path = paths
            .iter()
            .map(|path| path.as_ref().to_string_lossy().trim().to_string())
            .find(|path| !path.is_empty())
            .ok_or(WizardError::NothingDropped)?;
        self.begin_mods_selection(&path)
    }

    pub fn complete_mods_validation(
        &mut self,
        ticket: &ValidationTicket,
        outcome: Result<ModsValidationResult, MigrationError>,
    ) -> Completion {
        if !self.accepts(ticket, SourceCategory::Mods) {
            self.discard_stale(ticket, outcome.ok().as_ref());
            return Completion::Stale;
        }

        let source = ticket.source.clone();
        self.working.mods = match outcome {
            Ok(result) if result.valid => SourceSlot::Ready { source, result },
            Ok(result) => {
                if let Some(staged) = result.staged_path() {
                    self.released.push(staged.to_string());
                }
                SourceSlot::Failed {
                    source,
                    message: "No usable mods were found in the selected source.".to_string(),
                }
            }
            Err(err) => SourceSlot::Failed {
                source,
                message: err.to_string(),
            },
        };
        self.refresh_ram();
        Completion::Applied
    }

    pub fn clear_mods(&mut self) -> Result<(), WizardError> {
        self.ensure_active()?;
        if self.working.creating {
            return Err(WizardError::Busy);
        }
        if let Some(staged) = self.working.mods.staged_path() {
            self.released.push(staged);
        }
        self.working.mods = SourceSlot::Empty;
        self.refresh_ram();
        Ok(())
    }

    pub fn set_server_name(&mut self, name: &str) -> Result<(), WizardError> {
        self.ensure_active()?;
        self.working.draft.name = name.to_string();
        self.working.config_mode = FieldMode::UserOverridden;
        Ok(())
    }

    pub fn set_server_type(&mut self, server_type: ServerType) -> Result<(), WizardError> {
        self.ensure_active()?;
        self.working.draft.server_type = server_type;
        self.working.config_mode = FieldMode::UserOverridden;
        Ok(())
    }

    pub fn set_server_version(&mut self, version: &str) -> Result<(), WizardError> {
        self.ensure_active()?;
        self.working.draft.version = version.to_string();
        self.working.config_mode = FieldMode::UserOverridden;
        Ok(())
    }

    pub fn set_online_mode(&mut self, online_mode: bool) -> Result<(), WizardError> {
        self.ensure_active()?;
        self.working.draft.online_mode = online_mode;
        Ok(())
    }

    pub fn select_ram(&mut self, ram_gb: u32) -> Result<(), WizardError> {
        self.ensure_active()?;
        if !self.ram_options().contains(&ram_gb) {
            return Err(WizardError::InvalidRam(ram_gb));
        }
        self.working.draft.ram_gb = ram_gb;
        self.working.ram_mode = FieldMode::UserOverridden;
        Ok(())
    }

    pub fn use_recommended_ram(&mut self) -> Result<(), WizardError> {
        self.ensure_active()?;
        self.working.ram_mode = FieldMode::Auto;
        self.refresh_ram();
        Ok(())
    }

    pub fn can_create(&self) -> bool {
        self.create_gate().is_ok()
    }

    pub fn begin_create(&mut self) -> Result<CreateTicket, WizardError> {
        self.create_gate()?;
        let payload = self.build_payload().ok_or(WizardError::StepBlocked {
            step: WizardStep::Summary,
            reason: "Select a valid world before creating the server.".to_string(),
        })?;
        self.working.creating = true;
        self.working.create_error = None;
        info!(name = %payload.name, "creating migrated server");
        Ok(CreateTicket {
            session: self.session,
            payload,
        })
    }

    pub fn complete_create(
        &mut self,
        ticket: &CreateTicket,
        outcome: Result<ServerConfig, MigrationError>,
    ) -> Completion {
        if ticket.session != self.session || !self.is_active() || !self.working.creating {
            warn!("discarding creation result for a closed migration session");
            return Completion::Stale;
        }
        self.working.creating = false;

        match outcome {
            Ok(server) => {
                info!(name = %server.name, dir = %server.server_dir, "migrated server created");
                self.created = Some(server);
                self.status = SessionStatus::Completed;
                // the backend consumed the staged copies while creating
                self.working = WorkingState::new(&self.config);
            }
            Err(err) => {
                warn!("server creation failed: {}", err);
                self.working.create_error = Some(err.to_string());
            }
        }
        Completion::Applied
    }

    /// Abandons the session. Returns `false` if it had already ended.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        for staged in [self.working.world.staged_path(), self.working.mods.staged_path()]
            .into_iter()
            .flatten()
        {
            self.released.push(staged);
        }
        self.working = WorkingState::new(&self.config);
        self.status = SessionStatus::Cancelled;
        info!(session = self.session, "migration wizard cancelled");
        true
    }

    pub fn summary(&self) -> Option<MigrationSummary> {
        let world = self.world_result().filter(|world| world.valid)?;
        let mods = self.mods_result().filter(|mods| mods.valid);
        Some(MigrationSummary {
            hosting: self.working.hosting,
            world_name: world.world_name.clone(),
            world_source_kind: world.source_kind,
            world_size_bytes: world.size_bytes,
            detection: self.detection(),
            mod_count: mods.map(|mods| mods.mod_count),
            detected_pack: mods.and_then(|mods| mods.detected_pack),
            comparison: self.comparison(),
            draft: self.working.draft.clone(),
            ram_mode: self.working.ram_mode,
        })
    }

    fn gate(&self, step: WizardStep) -> Result<(), String> {
        match step {
            WizardStep::Hosting | WizardStep::Instructions => {
                if self.working.hosting.is_none() {
                    return Err("Choose where your world is hosted right now.".to_string());
                }
                Ok(())
            }
            WizardStep::WorldImport | WizardStep::DetectionAndMods => {
                if self.working.world.is_validating() {
                    return Err("Still checking the selected world.".to_string());
                }
                if !self.world_is_valid() {
                    return Err(self
                        .world_error()
                        .map(str::to_string)
                        .unwrap_or_else(|| "Select a valid world to continue.".to_string()));
                }
                Ok(())
            }
            WizardStep::Configure => self.draft_gate(),
            WizardStep::Summary => Err("This is the last step.".to_string()),
        }
    }

    fn draft_gate(&self) -> Result<(), String> {
        if self.working.draft.name.trim().is_empty() {
            return Err("Enter a name for the server.".to_string());
        }
        if self.working.draft.version.trim().is_empty() {
            return Err("Enter the Minecraft version of the world.".to_string());
        }
        Ok(())
    }

    fn create_gate(&self) -> Result<(), WizardError> {
        self.ensure_active()?;
        if self.working.step != WizardStep::Summary {
            return Err(WizardError::NotAtSummary);
        }
        if self.is_busy() {
            return Err(WizardError::Busy);
        }
        if !self.world_is_valid() {
            return Err(WizardError::StepBlocked {
                step: WizardStep::Summary,
                reason: "Select a valid world before creating the server.".to_string(),
            });
        }
        self.draft_gate().map_err(|reason| WizardError::StepBlocked {
            step: WizardStep::Summary,
            reason,
        })
    }

    fn build_payload(&self) -> Option<MigrationCreatePayload> {
        let (world_source, world) = match &self.working.world {
            SourceSlot::Ready { source, result } if result.valid => (source, result),
            _ => return None,
        };
        let mod_import = match &self.working.mods {
            SourceSlot::Ready { source, result } if result.valid => Some(ModsImportPayload {
                source_path: source.path.clone(),
                source_kind: source.kind,
                staged_path: result.staged_path.clone(),
            }),
            _ => None,
        };
        let draft = &self.working.draft;

        Some(MigrationCreatePayload {
            name: draft.name.trim().to_string(),
            server_type: draft.server_type,
            version: draft.version.trim().to_string(),
            ram_gb: draft.ram_gb,
            online_mode: draft.online_mode,
            port: draft.port,
            world_import: WorldImportPayload {
                source_path: world_source.path.clone(),
                source_kind: world_source.kind,
                staged_path: world.staged_path.clone(),
            },
            mod_import,
        })
    }

    fn auto_fill(&mut self) {
        if self.working.config_mode == FieldMode::Auto {
            if let Some(world) = self.world_result().filter(|world| world.valid) {
                let name = match world.world_name.trim() {
                    "" => DEFAULT_SERVER_NAME.to_string(),
                    value => value.to_string(),
                };
                let profile = self.detection();
                let draft = &mut self.working.draft;
                draft.name = name;
                if let Some(profile) = profile {
                    draft.server_type = profile.loader.into();
                    // an undetected version must be typed in, never carried over
                    draft.version = profile.version.unwrap_or_default();
                }
                debug!(name = %draft.name, version = %draft.version, "configuration auto-filled");
            }
        }
        self.refresh_ram();
    }

    fn refresh_ram(&mut self) {
        if self.working.ram_mode != FieldMode::Auto {
            return;
        }
        if let Some(recommended) = self.recommended_ram_gb() {
            self.working.draft.ram_gb = recommended;
        }
    }

    fn accepts(&self, ticket: &ValidationTicket, category: SourceCategory) -> bool {
        if ticket.session != self.session || ticket.category != category || !self.is_active() {
            return false;
        }
        match category {
            SourceCategory::World => self.working.world.is_current(ticket.seq),
            SourceCategory::Mods => self.working.mods.is_current(ticket.seq),
        }
    }

    fn discard_stale<T: Staged>(&mut self, ticket: &ValidationTicket, result: Option<&T>) {
        warn!(
            path = %ticket.source.path,
            category = ?ticket.category,
            "discarding superseded validation result"
        );
        if let Some(staged) = result.and_then(|result| result.staged_path()) {
            self.released.push(staged.to_string());
        }
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn ensure_active(&self) -> Result<(), WizardError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(WizardError::SessionClosed)
        }
    }
}

fn select(path: &str) -> SelectedSource {
    let path = path.trim().to_string();
    let kind = classify(&path);
    SelectedSource { path, kind }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectedType;

    const MB: u64 = 1024 * 1024;

    fn world(name: &str, size_bytes: u64, detected_type: Option<DetectedType>) -> WorldValidationResult {
        WorldValidationResult {
            valid: true,
            source_kind: SourceKind::Archive,
            world_name: name.to_string(),
            world_path: format!("/staged/{name}"),
            staged_path: Some(format!("/staged/{name}")),
            size_bytes,
            has_level_dat: true,
            has_region: true,
            has_playerdata: true,
            has_data: true,
            has_dim_nether: false,
            has_dim_end: false,
            detected_version: Some("1.20.1".to_string()),
            detected_type,
        }
    }

    fn mods(count: usize) -> ModsValidationResult {
        ModsValidationResult {
            valid: true,
            source_kind: SourceKind::Folder,
            mods_path: "/mods".to_string(),
            staged_path: None,
            mod_count: count,
            detected_pack: Some(DetectedPack::Curseforge),
        }
    }

    fn wizard_at_world_import() -> MigrationWizard {
        let mut wizard = MigrationWizard::new(MigrationConfig::default());
        wizard.set_system_ram(Some(16));
        wizard.choose_hosting(HostingSource::Zip).unwrap();
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.step(), WizardStep::WorldImport);
        wizard
    }

    fn load_world(wizard: &mut MigrationWizard, result: WorldValidationResult) {
        let ticket = wizard.begin_world_selection("/downloads/world.zip").unwrap();
        assert_eq!(wizard.complete_world_validation(&ticket, Ok(result)), Completion::Applied);
    }

    #[test]
    fn hosting_choice_gates_first_two_steps() {
        let mut wizard = MigrationWizard::new(MigrationConfig::default());
        assert!(!wizard.can_advance());
        assert!(matches!(wizard.next(), Err(WizardError::StepBlocked { .. })));

        wizard.choose_hosting(HostingSource::Aternos).unwrap();
        assert!(wizard.can_advance());
        assert_eq!(wizard.next(), Ok(WizardStep::Instructions));
        assert!(wizard.can_advance());
        assert_eq!(wizard.next(), Ok(WizardStep::WorldImport));
        assert!(!wizard.can_advance());
        assert_eq!(
            wizard.blocked_reason().as_deref(),
            Some("Select a valid world to continue.")
        );
    }

    #[test]
    fn world_gate_follows_validation() {
        let mut wizard = wizard_at_world_import();
        let ticket = wizard.begin_world_selection("/downloads/World.ZIP").unwrap();
        assert_eq!(ticket.source.kind, SourceKind::Archive);
        assert!(wizard.is_busy());
        assert!(!wizard.can_advance());

        wizard.complete_world_validation(&ticket, Ok(world("survival", 300 * MB, None)));
        assert!(!wizard.is_busy());
        assert!(wizard.can_advance());
        assert_eq!(wizard.next(), Ok(WizardStep::DetectionAndMods));
        assert!(wizard.can_advance());
    }

    #[test]
    fn validation_failure_stays_on_step_with_message() {
        let mut wizard = wizard_at_world_import();
        let ticket = wizard.begin_world_selection("/downloads/broken.zip").unwrap();
        let completion = wizard.complete_world_validation(
            &ticket,
            Err(MigrationError::validation("Selected zip file is corrupted or unsupported")),
        );
        assert_eq!(completion, Completion::Applied);
        assert!(!wizard.is_busy());
        assert_eq!(wizard.step(), WizardStep::WorldImport);
        assert_eq!(wizard.world_error(), Some("Selected zip file is corrupted or unsupported"));
        assert!(matches!(wizard.next(), Err(WizardError::StepBlocked { .. })));

        // retry by picking again
        load_world(&mut wizard, world("survival", MB, None));
        assert!(wizard.can_advance());
        assert_eq!(wizard.world_error(), None);
    }

    #[test]
    fn invalid_result_is_treated_as_absent() {
        let mut wizard = wizard_at_world_import();
        let mut invalid = world("survival", MB, Some(DetectedType::Forge));
        invalid.valid = false;
        load_world(&mut wizard, invalid);
        assert!(!wizard.can_advance());
        assert_eq!(wizard.detection(), None);
        assert!(!wizard.comparison().mismatch);
        assert_eq!(wizard.take_released_staged(), vec!["/staged/survival".to_string()]);
    }

    #[test]
    fn last_selection_wins_regardless_of_resolution_order() {
        let mut wizard = wizard_at_world_import();
        let first = wizard.begin_world_selection("/downloads/old.zip").unwrap();
        let second = wizard.begin_world_selection("/downloads/new.zip").unwrap();

        assert_eq!(
            wizard.complete_world_validation(&second, Ok(world("new", MB, None))),
            Completion::Applied
        );
        assert_eq!(
            wizard.complete_world_validation(&first, Ok(world("old", MB, None))),
            Completion::Stale
        );

        assert_eq!(wizard.world_result().unwrap().world_name, "new");
        assert_eq!(wizard.world().source().unwrap().path, "/downloads/new.zip");
        assert_eq!(wizard.take_released_staged(), vec!["/staged/old".to_string()]);
    }

    #[test]
    fn stale_failure_does_not_clear_busy_state() {
        let mut wizard = wizard_at_world_import();
        let first = wizard.begin_world_selection("/a.zip").unwrap();
        let second = wizard.begin_world_selection("/b.zip").unwrap();
        wizard.complete_world_validation(&first, Err(MigrationError::validation("boom")));
        assert!(wizard.world().is_validating());
        assert_eq!(wizard.world_error(), None);
        wizard.complete_world_validation(&second, Ok(world("b", MB, None)));
        assert!(!wizard.is_busy());
    }

    #[test]
    fn new_selection_invalidates_previous_staged_path() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("first", MB, None));
        wizard.begin_world_selection("/downloads/second.zip").unwrap();
        assert_eq!(wizard.world_result(), None);
        assert_eq!(wizard.take_released_staged(), vec!["/staged/first".to_string()]);
        assert!(!wizard.can_advance());
    }

    #[test]
    fn auto_fill_uses_detection_and_ram_engine() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("Skyblock", 2 * 1024 * MB, Some(DetectedType::Forge)));
        wizard.next().unwrap();

        let draft = wizard.draft();
        assert_eq!(draft.name, "Skyblock");
        assert_eq!(draft.server_type, ServerType::Forge);
        assert_eq!(draft.version, "1.20.1");
        // 4 + 1 for a world above 1 GiB, rounded up to even
        assert_eq!(draft.ram_gb, 6);
        assert!(wizard.comparison().mismatch);

        let ticket = wizard.begin_mods_selection("/mods").unwrap();
        wizard.complete_mods_validation(&ticket, Ok(mods(60)));
        assert!(!wizard.comparison().mismatch);
        // 4 + 3 + 1
        assert_eq!(wizard.draft().ram_gb, 8);
    }

    #[test]
    fn blank_world_name_falls_back_to_default() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("  ", MB, None));
        assert_eq!(wizard.draft().name, DEFAULT_SERVER_NAME);
    }

    #[test]
    fn mismatch_is_advisory_only() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("modded", MB, Some(DetectedType::Forge)));
        wizard.next().unwrap();
        assert!(wizard.comparison().mismatch);
        assert!(wizard.can_advance());
        assert_eq!(wizard.next(), Ok(WizardStep::Configure));
    }

    #[test]
    fn manual_edit_survives_revalidation() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("first", MB, None));
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.step(), WizardStep::Configure);

        wizard.set_server_name("My Server").unwrap();
        assert_eq!(wizard.config_mode(), FieldMode::UserOverridden);

        wizard.back().unwrap();
        wizard.back().unwrap();
        load_world(&mut wizard, world("second", MB, Some(DetectedType::Forge)));
        wizard.next().unwrap();
        wizard.next().unwrap();

        assert_eq!(wizard.draft().name, "My Server");
        assert_eq!(wizard.draft().server_type, ServerType::Vanilla);
    }

    #[test]
    fn ram_override_is_independent_of_config_override() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("w", MB, None));
        assert_eq!(wizard.draft().ram_gb, 4);

        wizard.select_ram(10).unwrap();
        assert_eq!(wizard.ram_mode(), FieldMode::UserOverridden);
        assert_eq!(wizard.config_mode(), FieldMode::Auto);

        let ticket = wizard.begin_mods_selection("/mods").unwrap();
        wizard.complete_mods_validation(&ticket, Ok(mods(100)));
        assert_eq!(wizard.draft().ram_gb, 10);

        wizard.use_recommended_ram().unwrap();
        assert_eq!(wizard.ram_mode(), FieldMode::Auto);
        assert_eq!(wizard.draft().ram_gb, 8);

        // a name edit does not freeze RAM
        wizard.set_server_name("x").unwrap();
        wizard.clear_mods().unwrap();
        assert_eq!(wizard.draft().ram_gb, 4);
    }

    #[test]
    fn unversioned_world_clears_auto_filled_version() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("a", MB, None));
        assert_eq!(wizard.draft().version, "1.20.1");

        let mut unversioned = world("b", MB, None);
        unversioned.detected_version = None;
        load_world(&mut wizard, unversioned);
        assert_eq!(wizard.config_mode(), FieldMode::Auto);
        assert_eq!(wizard.draft().name, "b");
        assert_eq!(wizard.draft().version, "");

        wizard.next().unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.step(), WizardStep::Configure);
        assert!(!wizard.can_advance());
    }

    #[test]
    fn ram_outside_the_offered_options_is_rejected() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("w", MB, None));
        assert_eq!(wizard.ram_options(), vec![2, 4, 6, 8, 10, 12]);

        assert_eq!(wizard.select_ram(0), Err(WizardError::InvalidRam(0)));
        assert_eq!(wizard.select_ram(99), Err(WizardError::InvalidRam(99)));
        assert_eq!(wizard.select_ram(5), Err(WizardError::InvalidRam(5)));
        assert_eq!(wizard.ram_mode(), FieldMode::Auto);
        assert_eq!(wizard.draft().ram_gb, 4);

        wizard.select_ram(12).unwrap();
        assert_eq!(wizard.ram_mode(), FieldMode::UserOverridden);
        assert_eq!(wizard.draft().ram_gb, 12);
    }

    #[test]
    fn configure_requires_name_and_version() {
        let mut wizard = wizard_at_world_import();
        let mut unversioned = world("w", MB, None);
        unversioned.detected_version = None;
        load_world(&mut wizard, unversioned);
        wizard.next().unwrap();
        wizard.next().unwrap();

        assert!(!wizard.can_advance());
        assert_eq!(
            wizard.blocked_reason().as_deref(),
            Some("Enter the Minecraft version of the world.")
        );
        wizard.set_server_version("  1.19.4 ").unwrap();
        assert!(wizard.can_advance());
        wizard.set_server_name("   ").unwrap();
        assert!(!wizard.can_advance());
        wizard.set_server_name("Server").unwrap();
        assert_eq!(wizard.next(), Ok(WizardStep::Summary));
        assert!(!wizard.can_advance());
    }

    #[test]
    fn drop_uses_the_same_path_as_the_picker() {
        let mut picked = wizard_at_world_import();
        let mut dropped = picked.clone();

        let from_picker = picked.begin_mods_selection("/packs/All The Mods.zip").unwrap();
        let from_drop = dropped
            .drop_mods_source(&[Path::new("/packs/All The Mods.zip")])
            .unwrap();
        assert_eq!(from_picker.source, from_drop.source);
        assert_eq!(picked.mods(), dropped.mods());

        let empty: [&Path; 0] = [];
        assert_eq!(dropped.drop_mods_source(&empty), Err(WizardError::NothingDropped));
    }

    #[test]
    fn create_assembles_payload_and_ends_session() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("survival", 300 * MB, Some(DetectedType::Vanilla)));
        assert!(matches!(wizard.begin_create(), Err(WizardError::NotAtSummary)));
        wizard.next().unwrap();
        wizard.next().unwrap();
        wizard.next().unwrap();
        assert!(wizard.can_create());

        let ticket = wizard.begin_create().unwrap();
        assert!(wizard.is_creating());
        assert!(matches!(wizard.begin_create(), Err(WizardError::Busy)));
        assert_eq!(ticket.payload.world_import.staged_path.as_deref(), Some("/staged/survival"));
        assert_eq!(ticket.payload.world_import.source_kind, SourceKind::Archive);
        assert_eq!(ticket.payload.mod_import, None);
        assert_eq!(ticket.payload.ram_gb, 4);

        let server = ServerConfig {
            name: "survival".to_string(),
            server_type: ServerType::Vanilla,
            version: "1.20.1".to_string(),
            ram_gb: 4,
            online_mode: true,
            port: 25565,
            server_dir: "/data/servers/survival".to_string(),
        };
        assert_eq!(wizard.complete_create(&ticket, Ok(server.clone())), Completion::Applied);
        assert_eq!(wizard.status(), SessionStatus::Completed);
        assert_eq!(wizard.created(), Some(&server));
        assert_eq!(wizard.world_result(), None);
        assert!(wizard.take_released_staged().is_empty());
    }

    #[test]
    fn failed_create_keeps_state_for_retry() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("survival", MB, None));
        wizard.next().unwrap();
        wizard.next().unwrap();
        wizard.next().unwrap();

        let ticket = wizard.begin_create().unwrap();
        wizard.complete_create(&ticket, Err(MigrationError::creation("Server name is already in use")));
        assert_eq!(wizard.step(), WizardStep::Summary);
        assert!(!wizard.is_creating());
        assert_eq!(wizard.create_error(), Some("Server name is already in use"));
        assert!(wizard.world_is_valid());

        let retry = wizard.begin_create().unwrap();
        assert_eq!(wizard.create_error(), None);
        assert_eq!(retry.payload, ticket.payload);
    }

    #[test]
    fn cancel_discards_everything_and_late_results() {
        let mut wizard = wizard_at_world_import();
        load_world(&mut wizard, world("kept", MB, None));
        let pending = wizard.begin_mods_selection("/mods.zip").unwrap();

        assert!(wizard.cancel());
        assert!(!wizard.cancel());
        assert_eq!(wizard.status(), SessionStatus::Cancelled);
        assert_eq!(wizard.step(), WizardStep::Hosting);
        assert_eq!(wizard.world_result(), None);
        assert_eq!(wizard.take_released_staged(), vec!["/staged/kept".to_string()]);

        let mut late = mods(3);
        late.staged_path = Some("/staged/late-mods".to_string());
        assert_eq!(wizard.complete_mods_validation(&pending, Ok(late)), Completion::Stale);
        assert_eq!(wizard.mods_result(), None);
        assert_eq!(wizard.take_released_staged(), vec!["/staged/late-mods".to_string()]);
        assert_eq!(wizard.begin_world_selection("/x"), Err(WizardError::SessionClosed));
        assert_eq!(wizard.blocked_reason().as_deref(), Some("The migration session has already ended"));
    }

    #[test]
    fn tickets_from_another_session_are_stale() {
        let mut a = wizard_at_world_import();
        let mut b = wizard_at_world_import();
        let ticket = a.begin_world_selection("/w.zip").unwrap();
        b.begin_world_selection("/w.zip").unwrap();
        assert_eq!(b.complete_world_validation(&ticket, Ok(world("w", MB, None))), Completion::Stale);
    }

    #[test]
    fn summary_reflects_working_state() {
        let mut wizard = wizard_at_world_import();
        assert_eq!(wizard.summary(), None);
        load_world(&mut wizard, world("survival", 300 * MB, Some(DetectedType::Forge)));
        let ticket = wizard.begin_mods_selection("/mods").unwrap();
        wizard.complete_mods_validation(&ticket, Ok(mods(30)));

        let summary = wizard.summary().unwrap();
        assert_eq!(summary.hosting, Some(HostingSource::Zip));
        assert_eq!(summary.world_size_bytes, 300 * MB);
        assert_eq!(summary.mod_count, Some(30));
        assert_eq!(summary.detected_pack, Some(DetectedPack::Curseforge));
        assert!(!summary.comparison.mismatch);
        assert_eq!(summary.draft.ram_gb, 6);
    }

    #[test]
    fn unknown_system_ram_keeps_fallback_allocation() {
        let mut wizard = MigrationWizard::new(MigrationConfig::default());
        wizard.choose_hosting(HostingSource::Other).unwrap();
        wizard.next().unwrap();
        wizard.next().unwrap();
        load_world(&mut wizard, world("w", 5 * 1024 * MB, None));
        assert_eq!(wizard.recommended_ram_gb(), None);
        assert_eq!(wizard.draft().ram_gb, 4);
        assert_eq!(wizard.ram_options(), vec![2, 4]);

        wizard.set_system_ram(Some(16));
        assert_eq!(wizard.draft().ram_gb, 6);
        assert_eq!(wizard.ram_options(), vec![2, 4, 6, 8, 10, 12]);
    }
}
