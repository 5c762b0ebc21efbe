use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use super::mods::{count_mods, detect_modpack_type, import_mods_into_server};
use super::staging::release_staged;
use super::world::{detect_modded_world, import_world_into_server};
use crate::config::AppPaths;
use crate::events::EventEmitter;
use crate::models::{MigrationCreatePayload, ServerConfig, ServerMetadata, ServerRegistry};

pub(crate) fn sanitize_name(name: &str) -> String {
    let mut cleaned = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            cleaned.push(ch);
        } else if ch.is_whitespace() {
            cleaned.push('_');
        }
    }
    if cleaned.is_empty() {
        "minecraft_server".to_string()
    } else {
        cleaned
    }
}

pub(crate) fn load_registry(path: &Path) -> Result<ServerRegistry, String> {
    if !path.exists() {
        return Ok(ServerRegistry::default());
    }
    let content = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&content).map_err(|err| err.to_string())
}

fn save_registry(path: &Path, registry: &ServerRegistry) -> Result<(), String> {
    let content = serde_json::to_string_pretty(registry).map_err(|err| err.to_string())?;
    fs::write(path, content).map_err(|err| err.to_string())
}

fn write_server_properties(server_dir: &Path, port: u16, online_mode: bool) -> Result<(), String> {
    let content = format!(
        "server-port={}\nonline-mode={}\nmotd=Gamehost ONE\n",
        port, online_mode
    );
    fs::write(server_dir.join("server.properties"), content).map_err(|err| err.to_string())
}

fn write_eula(server_dir: &Path) -> Result<(), String> {
    fs::write(server_dir.join("eula.txt"), "eula=true\n").map_err(|err| err.to_string())
}

fn write_user_jvm_args(server_dir: &Path, ram_gb: u32) -> Result<(), String> {
    let content = format!("-Xms{}G\n-Xmx{}G\n", ram_gb, ram_gb);
    fs::write(server_dir.join("user_jvm_args.txt"), content).map_err(|err| err.to_string())
}

fn scan_server_metadata(server_dir: &Path, payload: &MigrationCreatePayload) -> ServerMetadata {
    let mods_dir = server_dir.join("mods");
    ServerMetadata {
        loader: payload.server_type.loader_label().to_string(),
        mc_version: payload.version.clone(),
        mod_count: if mods_dir.exists() { count_mods(&mods_dir) } else { 0 },
        modded_world: detect_modded_world(&server_dir.join("world")),
        modpack: payload
            .mod_import
            .as_ref()
            .and_then(|mods| mods.staged_path.as_deref().or(Some(mods.source_path.as_str())))
            .and_then(|root| detect_modpack_type(Path::new(root))),
        detected_at: Utc::now().to_rfc3339(),
    }
}

fn save_server_metadata(server_dir: &Path, metadata: &ServerMetadata) -> Result<(), String> {
    let content = serde_json::to_string_pretty(metadata).map_err(|err| err.to_string())?;
    fs::write(server_dir.join("metadata.json"), content).map_err(|err| err.to_string())
}

fn populate_server_dir(
    paths: &AppPaths,
    server_dir: &Path,
    server_name: &str,
    payload: &MigrationCreatePayload,
    events: &dyn EventEmitter,
) -> Result<(), String> {
    fs::create_dir_all(server_dir).map_err(|err| err.to_string())?;
    write_server_properties(server_dir, payload.port, payload.online_mode)?;
    write_eula(server_dir)?;
    write_user_jvm_args(server_dir, payload.ram_gb)?;

    import_world_into_server(paths, server_dir, server_name, &payload.world_import, events)?;
    if let Some(mods) = &payload.mod_import {
        import_mods_into_server(paths, server_dir, mods, payload.server_type, &payload.version)?;
    }

    save_server_metadata(server_dir, &scan_server_metadata(server_dir, payload))
}

/// Materialises `servers/<name>/` and registers it.
///
/// A failure part way through removes the server folder again; nothing is
/// added to the registry in that case.
pub(crate) fn create_server(
    paths: &AppPaths,
    payload: &MigrationCreatePayload,
    events: &dyn EventEmitter,
) -> Result<ServerConfig, String> {
    let registry_path = paths.registry_path();
    let mut registry = load_registry(&registry_path)?;
    let server_name = sanitize_name(&payload.name);
    if registry
        .servers
        .iter()
        .any(|server| sanitize_name(&server.name) == server_name)
    {
        return Err("Server name is already in use".to_string());
    }

    let server_dir: PathBuf = paths.servers_dir().join(&server_name);
    if server_dir.exists() {
        return Err("Server name is already in use".to_string());
    }

    if let Err(err) = populate_server_dir(paths, &server_dir, &server_name, payload, events) {
        warn!(server = %server_name, "removing half-built server folder: {}", err);
        let _ = fs::remove_dir_all(&server_dir);
        return Err(err);
    }

    let config = ServerConfig {
        name: payload.name.clone(),
        server_type: payload.server_type,
        version: payload.version.clone(),
        ram_gb: payload.ram_gb,
        online_mode: payload.online_mode,
        port: payload.port,
        server_dir: server_dir.to_string_lossy().to_string(),
    };

    registry.servers.push(config.clone());
    if let Err(err) = save_registry(&registry_path, &registry) {
        let _ = fs::remove_dir_all(&server_dir);
        return Err(err);
    }
    for staged in [
        payload.world_import.staged_path.as_deref(),
        payload.mod_import.as_ref().and_then(|mods| mods.staged_path.as_deref()),
    ]
    .into_iter()
    .flatten()
    {
        let _ = release_staged(paths, Path::new(staged));
    }
    info!(server = %config.name, dir = %config.server_dir, "server created");
    Ok(config)
}
