//! Filesystem implementation of [`MigrationBackend`].

mod mods;
mod server;
mod staging;
mod world;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sysinfo::System;
use tracing::{debug, warn};

use crate::config::AppPaths;
use crate::error::MigrationError;
use crate::events::EventEmitter;
use crate::models::{
    MigrationCreatePayload, ModsValidationResult, ServerConfig, ServerRegistry, SourceKind,
    WorldValidationResult,
};
use crate::validator::MigrationBackend;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Validates, stages and materialises servers under an [`AppPaths`] data
/// directory. Blocking work runs on tokio's blocking pool.
#[derive(Clone)]
pub struct LocalBackend {
    paths: AppPaths,
    events: Arc<dyn EventEmitter>,
}

impl LocalBackend {
    pub fn new(paths: AppPaths, events: Arc<dyn EventEmitter>) -> Result<Self, MigrationError> {
        paths.ensure_app_dirs()?;
        Ok(Self { paths, events })
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Servers registered so far.
    pub fn registry(&self) -> Result<ServerRegistry, MigrationError> {
        server::load_registry(&self.paths.registry_path()).map_err(MigrationError::Config)
    }

    async fn run_blocking<T, F>(
        &self,
        task: F,
        into_error: fn(String) -> MigrationError,
    ) -> Result<T, MigrationError>
    where
        T: Send + 'static,
        F: FnOnce(&AppPaths, &dyn EventEmitter) -> Result<T, String> + Send + 'static,
    {
        let paths = self.paths.clone();
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || task(&paths, events.as_ref()))
            .await
            .map_err(|err| into_error(format!("Background task failed: {}", err)))?
            .map_err(into_error)
    }
}

fn validation_error(message: String) -> MigrationError {
    MigrationError::validation(message)
}

fn creation_error(message: String) -> MigrationError {
    MigrationError::creation(message)
}

#[async_trait]
impl MigrationBackend for LocalBackend {
    async fn validate_world_source(
        &self,
        source_path: &str,
        source_kind: SourceKind,
    ) -> Result<WorldValidationResult, MigrationError> {
        let source_path = source_path.to_string();
        self.run_blocking(
            move |paths, _| world::validate_world_source(paths, &source_path, source_kind),
            validation_error,
        )
        .await
    }

    async fn validate_mods_source(
        &self,
        source_path: &str,
        source_kind: SourceKind,
    ) -> Result<ModsValidationResult, MigrationError> {
        let source_path = source_path.to_string();
        self.run_blocking(
            move |paths, _| mods::validate_mods_source(paths, &source_path, source_kind),
            validation_error,
        )
        .await
    }

    async fn create_server(
        &self,
        payload: &MigrationCreatePayload,
    ) -> Result<ServerConfig, MigrationError> {
        let payload = payload.clone();
        self.run_blocking(
            move |paths, events| server::create_server(paths, &payload, events),
            creation_error,
        )
        .await
    }

    async fn system_ram_gb(&self) -> Option<u32> {
        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some((total as f64 / GIB).round() as u32)
    }

    async fn release_staged(&self, staged_path: &str) {
        match staging::release_staged(&self.paths, Path::new(staged_path)) {
            Ok(true) => debug!(staged = staged_path, "released staged copy"),
            Ok(false) => {}
            Err(err) => warn!(staged = staged_path, "failed to remove staged copy: {}", err),
        }
    }
}
