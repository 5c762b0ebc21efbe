use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::MigrationError;
use crate::models::{
    MigrationCreatePayload, ModsValidationResult, ServerConfig, SourceKind, WorldValidationResult,
};

/// Request/response bridge to the process that owns the filesystem.
///
/// Every call is independent; nothing here is transactional across calls.
#[async_trait]
pub trait MigrationBackend: Send + Sync {
    async fn validate_world_source(
        &self,
        source_path: &str,
        source_kind: SourceKind,
    ) -> Result<WorldValidationResult, MigrationError>;

    async fn validate_mods_source(
        &self,
        source_path: &str,
        source_kind: SourceKind,
    ) -> Result<ModsValidationResult, MigrationError>;

    async fn create_server(
        &self,
        payload: &MigrationCreatePayload,
    ) -> Result<ServerConfig, MigrationError>;

    /// Total installed memory in whole GB, if it can be read.
    async fn system_ram_gb(&self) -> Option<u32>;

    /// Drops a staged working copy that is no longer referenced.
    async fn release_staged(&self, _staged_path: &str) {}
}

#[derive(Clone)]
pub struct WorldValidatorClient {
    backend: Arc<dyn MigrationBackend>,
}

impl WorldValidatorClient {
    pub fn new(backend: Arc<dyn MigrationBackend>) -> Self {
        Self { backend }
    }

    pub async fn validate(
        &self,
        source_path: &str,
        source_kind: SourceKind,
    ) -> Result<WorldValidationResult, MigrationError> {
        match self.backend.validate_world_source(source_path, source_kind).await {
            Ok(result) => {
                info!(
                    path = source_path,
                    kind = source_kind.as_str(),
                    valid = result.valid,
                    size_bytes = result.size_bytes,
                    "world source validated"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(path = source_path, "world validation failed: {}", err);
                Err(as_validation_error(err))
            }
        }
    }
}

#[derive(Clone)]
pub struct ModsValidatorClient {
    backend: Arc<dyn MigrationBackend>,
}

impl ModsValidatorClient {
    pub fn new(backend: Arc<dyn MigrationBackend>) -> Self {
        Self { backend }
    }

    pub async fn validate(
        &self,
        source_path: &str,
        source_kind: SourceKind,
    ) -> Result<ModsValidationResult, MigrationError> {
        match self.backend.validate_mods_source(source_path, source_kind).await {
            Ok(result) => {
                info!(
                    path = source_path,
                    kind = source_kind.as_str(),
                    mod_count = result.mod_count,
                    "mods source validated"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(path = source_path, "mods validation failed: {}", err);
                Err(as_validation_error(err))
            }
        }
    }
}

fn as_validation_error(err: MigrationError) -> MigrationError {
    match err {
        MigrationError::Validation { message } => MigrationError::Validation { message },
        other => MigrationError::validation(other.to_string()),
    }
}
