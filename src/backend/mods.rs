use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::staging::{prepare_source, StagingArea};
use crate::config::AppPaths;
use crate::models::{
    DetectedPack, ModpackEntry, ModpackManifest, ModsImportPayload, ModsValidationResult, ServerType,
    SourceKind,
};

const NO_MODS: &str = "No .jar mods found in the selected source.";

#[derive(Debug, Deserialize)]
struct CurseForgeManifest {
    minecraft: CurseForgeMinecraft,
    files: Vec<CurseForgeFile>,
}

#[derive(Debug, Deserialize)]
struct CurseForgeMinecraft {
    version: String,
    #[serde(rename = "modLoaders")]
    mod_loaders: Vec<CurseForgeModLoader>,
}

#[derive(Debug, Deserialize)]
struct CurseForgeModLoader {
    id: String,
    primary: bool,
}

#[derive(Debug, Deserialize)]
struct CurseForgeFile {
    #[serde(rename = "projectID")]
    project_id: u64,
    #[serde(rename = "fileID")]
    file_id: u64,
}

#[derive(Debug, Deserialize)]
struct ModrinthIndex {
    dependencies: HashMap<String, String>,
    files: Vec<ModrinthFile>,
}

#[derive(Debug, Deserialize)]
struct ModrinthFile {
    path: String,
    #[serde(default)]
    hashes: HashMap<String, String>,
    #[serde(default)]
    downloads: Vec<String>,
}

fn is_jar(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
}

pub(crate) fn find_mods_root(path: &Path) -> Option<PathBuf> {
    let candidates = [
        path.join("overrides").join("mods"),
        path.join("mods"),
        path.join("minecraft").join("mods"),
    ];
    candidates
        .into_iter()
        .chain(std::iter::once(path.to_path_buf()))
        .find(|candidate| count_mods(candidate) > 0)
}

pub(crate) fn count_mods(mods_root: &Path) -> usize {
    fs::read_dir(mods_root)
        .map(|entries| entries.flatten().filter(|entry| is_jar(&entry.path())).count())
        .unwrap_or(0)
}

pub(crate) fn detect_modpack_type(root: &Path) -> Option<DetectedPack> {
    if root.join("modrinth.index.json").exists() {
        return Some(DetectedPack::Modrinth);
    }
    if root.join("manifest.json").exists() {
        return Some(DetectedPack::Curseforge);
    }
    None
}

fn normalize_loader_label(value: &str) -> String {
    let lower = value.to_lowercase();
    if lower.contains("fabric") {
        return "fabric".to_string();
    }
    if lower.contains("forge") || lower.contains("fml") {
        return "forge".to_string();
    }
    "none".to_string()
}

fn parse_curseforge_manifest(root: &Path) -> Result<Option<ModpackManifest>, String> {
    let path = root.join("manifest.json");
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|err| err.to_string())?;
    let manifest: CurseForgeManifest = serde_json::from_str(&content).map_err(|err| err.to_string())?;
    let loader = manifest
        .minecraft
        .mod_loaders
        .iter()
        .find(|loader| loader.primary)
        .or_else(|| manifest.minecraft.mod_loaders.first())
        .map(|loader| normalize_loader_label(&loader.id))
        .unwrap_or_else(|| "none".to_string());

    let mods = manifest
        .files
        .into_iter()
        .map(|entry| ModpackEntry {
            id: entry.project_id.to_string(),
            version: entry.file_id.to_string(),
            sha256: String::new(),
            url: String::new(),
        })
        .collect();

    Ok(Some(ModpackManifest {
        mc_version: manifest.minecraft.version,
        loader,
        mods,
    }))
}

fn parse_modrinth_index(root: &Path) -> Result<Option<ModpackManifest>, String> {
    let path = root.join("modrinth.index.json");
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|err| err.to_string())?;
    let index: ModrinthIndex = serde_json::from_str(&content).map_err(|err| err.to_string())?;
    let mc_version = index
        .dependencies
        .get("minecraft")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let loader = if index.dependencies.contains_key("forge") {
        "forge"
    } else if index.dependencies.contains_key("fabric-loader") || index.dependencies.contains_key("fabric") {
        "fabric"
    } else {
        "none"
    };

    let mods = index
        .files
        .into_iter()
        .map(|entry| ModpackEntry {
            id: Path::new(&entry.path)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("mod")
                .to_string(),
            version: "unknown".to_string(),
            sha256: entry.hashes.get("sha256").cloned().unwrap_or_default(),
            url: entry.downloads.first().cloned().unwrap_or_default(),
        })
        .collect();

    Ok(Some(ModpackManifest {
        mc_version,
        loader: loader.to_string(),
        mods,
    }))
}

fn build_modpack_from_source(root: &Path) -> Result<Option<ModpackManifest>, String> {
    if let Some(modrinth) = parse_modrinth_index(root)? {
        return Ok(Some(modrinth));
    }
    parse_curseforge_manifest(root)
}

fn sha256_file(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|err| err.to_string())?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(|err| err.to_string())?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Manifest listing the jars already in `<server_dir>/mods`, hashed.
fn build_modpack_from_server_mods(
    server_dir: &Path,
    server_type: ServerType,
    version: &str,
) -> Result<Option<ModpackManifest>, String> {
    let mods_dir = server_dir.join("mods");
    if !mods_dir.exists() {
        return Ok(None);
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&mods_dir).map_err(|err| err.to_string())? {
        let path = entry.map_err(|err| err.to_string())?.path();
        if !is_jar(&path) {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|name| name.to_str())
            .unwrap_or("mod")
            .to_string();
        entries.push(ModpackEntry {
            id,
            version: "unknown".to_string(),
            sha256: sha256_file(&path)?,
            url: String::new(),
        });
    }

    if entries.is_empty() {
        return Ok(None);
    }
    entries.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Some(ModpackManifest {
        mc_version: version.to_string(),
        loader: server_type.loader_label().to_string(),
        mods: entries,
    }))
}

fn save_modpack(server_dir: &Path, manifest: &ModpackManifest) -> Result<(), String> {
    let content = serde_json::to_string_pretty(manifest).map_err(|err| err.to_string())?;
    fs::write(server_dir.join("modpack.json"), content).map_err(|err| err.to_string())
}

pub(crate) fn validate_mods_source(
    paths: &AppPaths,
    source_path: &str,
    source_kind: SourceKind,
) -> Result<ModsValidationResult, String> {
    let input = ModsImportPayload {
        source_path: source_path.to_string(),
        source_kind,
        staged_path: None,
    };

    let source = prepare_source(paths, StagingArea::Mods, source_path, source_kind, None)?;
    let Some(mods_root) = find_mods_root(&source.root) else {
        source.discard_fresh(paths);
        return Err(NO_MODS.to_string());
    };

    Ok(ModsValidationResult {
        valid: true,
        source_kind,
        mod_count: count_mods(&mods_root),
        mods_path: mods_root.to_string_lossy().to_string(),
        detected_pack: detect_modpack_type(&source.root),
        staged_path: source.staged.map(|value| value.to_string_lossy().to_string()),
    })
}

/// Copies the source's jars into `<server_dir>/mods` and writes `modpack.json`.
pub(crate) fn import_mods_into_server(
    paths: &AppPaths,
    server_dir: &Path,
    input: &ModsImportPayload,
    server_type: ServerType,
    version: &str,
) -> Result<(), String> {
    let source = prepare_source(
        paths,
        StagingArea::Mods,
        &input.source_path,
        input.source_kind,
        input.staged_path.as_deref(),
    )?;
    let mods_root = find_mods_root(&source.root).ok_or_else(|| NO_MODS.to_string())?;

    let target_mods = server_dir.join("mods");
    fs::create_dir_all(&target_mods).map_err(|err| err.to_string())?;

    for entry in fs::read_dir(&mods_root).map_err(|err| err.to_string())? {
        let entry = entry.map_err(|err| err.to_string())?;
        let path = entry.path();
        if !is_jar(&path) {
            continue;
        }
        let file_name = entry.file_name();
        let destination = target_mods.join(&file_name);
        if destination.exists() {
            return Err(format!(
                "Mod already exists in target folder: {}",
                file_name.to_string_lossy()
            ));
        }
        fs::copy(&path, &destination).map_err(|err| err.to_string())?;
    }

    let manifest = match build_modpack_from_source(&source.root)? {
        Some(manifest) => Some(manifest),
        None => build_modpack_from_server_mods(server_dir, server_type, version)?,
    };
    if let Some(manifest) = manifest {
        save_modpack(server_dir, &manifest)?;
    }
    Ok(())
}
