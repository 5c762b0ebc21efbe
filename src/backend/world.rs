use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fastnbt::from_bytes;
use regex::Regex;
use serde::Deserialize;
use walkdir::WalkDir;

use super::staging::{prepare_source, StagingArea};
use crate::config::AppPaths;
use crate::events::{EventEmitter, WizardEvent};
use crate::models::{DetectedType, SourceKind, WorldCopyProgress, WorldImportPayload, WorldValidationResult};

const INVALID_WORLD: &str = "Selected folder does not appear to be a valid Minecraft world.";
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
struct LevelDat {
    #[serde(rename = "Data")]
    data: LevelDatData,
}

#[derive(Debug, Deserialize)]
struct LevelDatData {
    #[serde(rename = "Version")]
    version: Option<LevelDatVersion>,
    #[serde(rename = "Modded")]
    modded: Option<bool>,
    #[serde(rename = "WasModded")]
    was_modded: Option<bool>,
    #[serde(rename = "wasModded")]
    was_modded_legacy: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LevelDatVersion {
    #[serde(rename = "Name")]
    name: Option<String>,
}

#[derive(Debug)]
pub(crate) struct PreparedWorldSource {
    pub world_root: PathBuf,
    pub staged_root: Option<PathBuf>,
    pub size_bytes: u64,
    pub detected_version: Option<String>,
    pub detected_type: Option<DetectedType>,
    pub has_playerdata: bool,
    pub has_data: bool,
    pub has_dim_nether: bool,
    pub has_dim_end: bool,
}

fn is_valid_world_dir(path: &Path) -> bool {
    path.join("level.dat").is_file() && path.join("region").is_dir()
}

/// The folder itself, or its only child folder, when that is a world.
fn find_world_root(path: &Path) -> Option<PathBuf> {
    if is_valid_world_dir(path) {
        return Some(path.to_path_buf());
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(path).ok()?.flatten() {
        let child = entry.path();
        if child.is_dir() {
            candidates.push(child);
        }
    }
    if candidates.len() == 1 && is_valid_world_dir(&candidates[0]) {
        return Some(candidates.remove(0));
    }

    None
}

pub(crate) fn compute_dir_size(path: &Path) -> Result<u64, String> {
    let mut total = 0u64;
    for entry in WalkDir::new(path).into_iter().flatten() {
        let entry_path = entry.path();
        if entry_path.is_file() {
            total += entry_path.metadata().map_err(|err| err.to_string())?.len();
        }
    }
    Ok(total)
}

fn read_level_dat(world_root: &Path) -> Option<(Option<String>, bool)> {
    let file = File::open(world_root.join("level.dat")).ok()?;
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes).ok()?;
    let level: LevelDat = from_bytes(&bytes).ok()?;

    let detected_version = level
        .data
        .version
        .and_then(|version| version.name)
        .filter(|value| !value.trim().is_empty());
    let modded = level.data.modded.unwrap_or(false)
        || level.data.was_modded.unwrap_or(false)
        || level.data.was_modded_legacy.unwrap_or(false);
    Some((detected_version, modded))
}

pub(crate) fn guess_version_from_name(name: &str) -> Option<String> {
    let re = Regex::new(r"(\d+\.\d+(?:\.\d+)?)").ok()?;
    let caps = re.captures(name)?;
    caps.get(1).map(|m| m.as_str().to_string())
}

/// Version and loader from `level.dat` and forge data folders. A version that
/// only comes from the source name does not make the type known.
fn detect_world_metadata(world_root: &Path, source_name: &str) -> (Option<String>, Option<DetectedType>) {
    let (level_version, level_modded) = read_level_dat(world_root).unwrap_or((None, false));
    let has_forge_data = world_root.join("data").join("forge").exists()
        || world_root.join("data").join("fml").exists();

    let detected_type = if level_modded || has_forge_data {
        Some(DetectedType::Forge)
    } else if level_version.is_some() {
        Some(DetectedType::Vanilla)
    } else {
        None
    };

    let version = level_version.or_else(|| guess_version_from_name(source_name));
    (version, detected_type)
}

pub(crate) fn detect_modded_world(world_root: &Path) -> bool {
    if !world_root.exists() {
        return false;
    }
    detect_world_metadata(world_root, "").1 == Some(DetectedType::Forge)
}

pub(crate) fn prepare_world_source(
    paths: &AppPaths,
    input: &WorldImportPayload,
) -> Result<PreparedWorldSource, String> {
    let source = prepare_source(
        paths,
        StagingArea::Worlds,
        &input.source_path,
        input.source_kind,
        input.staged_path.as_deref(),
    )?;

    let Some(world_root) = find_world_root(&source.root) else {
        source.discard_fresh(paths);
        return Err(INVALID_WORLD.to_string());
    };

    let name_hint = source_name(&input.source_path, input.source_kind);
    let (detected_version, detected_type) = detect_world_metadata(&world_root, &name_hint);
    let size_bytes = match compute_dir_size(&world_root) {
        Ok(size) => size,
        Err(err) => {
            source.discard_fresh(paths);
            return Err(err);
        }
    };

    Ok(PreparedWorldSource {
        has_playerdata: world_root.join("playerdata").is_dir(),
        has_data: world_root.join("data").is_dir(),
        has_dim_nether: world_root.join("DIM-1").is_dir(),
        has_dim_end: world_root.join("DIM1").is_dir(),
        world_root,
        staged_root: source.staged,
        size_bytes,
        detected_version,
        detected_type,
    })
}

/// Folder name, or archive name without `.zip`.
fn source_name(source_path: &str, source_kind: SourceKind) -> String {
    let path = Path::new(source_path);
    let name = match source_kind {
        SourceKind::Folder => path.file_name(),
        SourceKind::Archive => path.file_stem(),
    };
    name.and_then(|s| s.to_str()).unwrap_or_default().to_string()
}

pub(crate) fn validate_world_source(
    paths: &AppPaths,
    source_path: &str,
    source_kind: SourceKind,
) -> Result<WorldValidationResult, String> {
    let input = WorldImportPayload {
        source_path: source_path.to_string(),
        source_kind,
        staged_path: None,
    };
    let prepared = prepare_world_source(paths, &input)?;

    // an archive with the world at its top level unpacks straight into the
    // staging folder, whose name means nothing to the user
    let world_name = if prepared.staged_root.as_deref() == Some(prepared.world_root.as_path()) {
        source_name(source_path, source_kind)
    } else {
        prepared
            .world_root
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("world")
            .to_string()
    };

    Ok(WorldValidationResult {
        valid: true,
        source_kind,
        world_name,
        world_path: prepared.world_root.to_string_lossy().to_string(),
        staged_path: prepared
            .staged_root
            .map(|value| value.to_string_lossy().to_string()),
        size_bytes: prepared.size_bytes,
        has_level_dat: prepared.world_root.join("level.dat").is_file(),
        has_region: prepared.world_root.join("region").is_dir(),
        has_playerdata: prepared.has_playerdata,
        has_data: prepared.has_data,
        has_dim_nether: prepared.has_dim_nether,
        has_dim_end: prepared.has_dim_end,
        detected_version: prepared.detected_version,
        detected_type: prepared.detected_type,
    })
}

pub(crate) fn copy_dir_with_progress(
    source: &Path,
    destination: &Path,
    events: &dyn EventEmitter,
    server_name: &str,
    total_bytes: u64,
) -> Result<(), String> {
    if !destination.exists() {
        fs::create_dir_all(destination).map_err(|err| err.to_string())?;
    }

    let mut copied = 0u64;
    let mut last_emit = Instant::now();
    let mut buffer = vec![0u8; 8 * 1024 * 1024];

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|err| err.to_string())?;
        let path = entry.path();
        let relative = path.strip_prefix(source).map_err(|err| err.to_string())?;
        let target = destination.join(relative);
        if path.is_dir() {
            fs::create_dir_all(&target).map_err(|err| err.to_string())?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }

        let mut input = File::open(path).map_err(|err| err.to_string())?;
        let mut output = File::create(&target).map_err(|err| err.to_string())?;
        loop {
            let read = input.read(&mut buffer).map_err(|err| err.to_string())?;
            if read == 0 {
                break;
            }
            output.write_all(&buffer[..read]).map_err(|err| err.to_string())?;
            copied = copied.saturating_add(read as u64);

            if total_bytes > 0 && last_emit.elapsed() >= PROGRESS_INTERVAL {
                let percent = ((copied as f64 / total_bytes as f64) * 100.0).round() as u8;
                events.emit(WizardEvent::WorldCopy(WorldCopyProgress {
                    server_name: server_name.to_string(),
                    total_bytes,
                    copied_bytes: copied,
                    percent: percent.min(100),
                }));
                last_emit = Instant::now();
            }
        }
    }

    events.emit(WizardEvent::WorldCopy(WorldCopyProgress {
        server_name: server_name.to_string(),
        total_bytes,
        copied_bytes: total_bytes.max(copied),
        percent: 100,
    }));
    Ok(())
}

pub(crate) fn set_level_name(server_dir: &Path, level_name: &str) -> Result<(), String> {
    let path = server_dir.join("server.properties");
    let content = fs::read_to_string(&path).unwrap_or_default();
    let mut lines = Vec::new();
    let mut updated = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with('!') || !trimmed.contains('=') {
            lines.push(line.to_string());
            continue;
        }
        let key = trimmed.split('=').next().unwrap_or("").trim();
        if key == "level-name" {
            lines.push(format!("level-name={}", level_name));
            updated = true;
        } else {
            lines.push(line.to_string());
        }
    }

    if !updated {
        lines.push(format!("level-name={}", level_name));
    }

    fs::write(path, format!("{}\n", lines.join("\n"))).map_err(|err| err.to_string())
}

/// Copies the world into `<server_dir>/world`. The staged copy is kept so a
/// failed creation can be retried.
pub(crate) fn import_world_into_server(
    paths: &AppPaths,
    server_dir: &Path,
    server_name: &str,
    input: &WorldImportPayload,
    events: &dyn EventEmitter,
) -> Result<(), String> {
    let prepared = prepare_world_source(paths, input)?;
    let target = server_dir.join("world");
    if target.exists() {
        fs::remove_dir_all(&target).map_err(|err| err.to_string())?;
    }

    copy_dir_with_progress(&prepared.world_root, &target, events, server_name, prepared.size_bytes)?;
    set_level_name(server_dir, "world")
}
