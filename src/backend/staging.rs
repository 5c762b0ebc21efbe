use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use zip::ZipArchive;

use crate::config::AppPaths;
use crate::models::SourceKind;

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

pub(crate) fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Extracts every entry whose name stays inside `target_dir`.
pub(crate) fn safe_extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), String> {
    let file = File::open(zip_path).map_err(|err| err.to_string())?;
    let mut archive =
        ZipArchive::new(file).map_err(|_| "Selected zip file is corrupted or unsupported".to_string())?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|err| err.to_string())?;
        let enclosed = match file.enclosed_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let outpath = target_dir.join(enclosed);
        if file.is_dir() {
            fs::create_dir_all(&outpath).map_err(|err| err.to_string())?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        let mut outfile = File::create(&outpath).map_err(|err| err.to_string())?;
        std::io::copy(&mut file, &mut outfile).map_err(|err| err.to_string())?;
    }
    Ok(())
}

/// Unpacks `zip_path` into a fresh folder under `staging_root`.
pub(crate) fn stage_zip(zip_path: &Path, staging_root: &Path, what: &str) -> Result<PathBuf, String> {
    if !zip_path.is_file() {
        return Err("Zip file not found".to_string());
    }
    if !is_zip(zip_path) {
        return Err(format!("Only .zip {} are supported", what));
    }
    let temp_root = staging_root.join(format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        STAGE_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    fs::create_dir_all(&temp_root).map_err(|err| err.to_string())?;
    if let Err(err) = safe_extract_zip(zip_path, &temp_root) {
        let _ = fs::remove_dir_all(&temp_root);
        return Err(err);
    }
    Ok(temp_root)
}

/// Which staging area a source is unpacked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StagingArea {
    Worlds,
    Mods,
}

impl StagingArea {
    fn root(self, paths: &AppPaths) -> PathBuf {
        match self {
            StagingArea::Worlds => paths.world_staging_root(),
            StagingArea::Mods => paths.mods_staging_root(),
        }
    }

    fn archive_label(self) -> &'static str {
        match self {
            StagingArea::Worlds => "worlds",
            StagingArea::Mods => "modpacks",
        }
    }

    fn missing_staged(self) -> &'static str {
        match self {
            StagingArea::Worlds => "Staged world folder not found",
            StagingArea::Mods => "Staged modpack folder not found",
        }
    }

    fn missing_folder(self) -> &'static str {
        match self {
            StagingArea::Worlds => "World folder not found",
            StagingArea::Mods => "Mods folder not found",
        }
    }
}

/// A source ready to be read from disk.
#[derive(Debug)]
pub(crate) struct PreparedSource {
    pub root: PathBuf,
    pub staged: Option<PathBuf>,
    /// Unpacked by this call rather than reused from an earlier validation.
    pub fresh: bool,
}

impl PreparedSource {
    /// Releases a copy this call unpacked. Reused copies are left for the caller.
    pub fn discard_fresh(&self, paths: &AppPaths) {
        if !self.fresh {
            return;
        }
        if let Some(staged) = &self.staged {
            let _ = release_staged(paths, staged);
        }
    }
}

/// Resolves a folder, a previously staged copy, or unpacks an archive.
pub(crate) fn prepare_source(
    paths: &AppPaths,
    area: StagingArea,
    source_path: &str,
    source_kind: SourceKind,
    staged_path: Option<&str>,
) -> Result<PreparedSource, String> {
    match (source_kind, staged_path) {
        (SourceKind::Archive, Some(staged)) => {
            let path = PathBuf::from(staged);
            if !path.exists() {
                return Err(area.missing_staged().to_string());
            }
            Ok(PreparedSource {
                root: path.clone(),
                staged: Some(path),
                fresh: false,
            })
        }
        (SourceKind::Archive, None) => {
            let staged = stage_zip(Path::new(source_path), &area.root(paths), area.archive_label())?;
            Ok(PreparedSource {
                root: staged.clone(),
                staged: Some(staged),
                fresh: true,
            })
        }
        (SourceKind::Folder, _) => {
            let path = PathBuf::from(source_path);
            if !path.is_dir() {
                return Err(area.missing_folder().to_string());
            }
            Ok(PreparedSource {
                root: path,
                staged: None,
                fresh: false,
            })
        }
    }
}

/// Removes a staged copy. Paths outside the staging roots are left alone.
pub(crate) fn release_staged(paths: &AppPaths, staged: &Path) -> Result<bool, String> {
    let owned = staged.starts_with(paths.world_staging_root())
        || staged.starts_with(paths.mods_staging_root());
    if !owned || !staged.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(staged).map_err(|err| err.to_string())?;
    Ok(true)
}
