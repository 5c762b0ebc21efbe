#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flate2::write::GzEncoder;
use flate2::Compression;
use gamehostone_migrate::events::{EventEmitter, WizardEvent};
use serde::Serialize;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Serialize)]
struct LevelDat {
    #[serde(rename = "Data")]
    data: LevelData,
}

#[derive(Serialize)]
struct LevelData {
    #[serde(rename = "LevelName")]
    level_name: String,
    #[serde(rename = "Version", skip_serializing_if = "Option::is_none")]
    version: Option<LevelVersion>,
    #[serde(rename = "WasModded")]
    was_modded: bool,
}

#[derive(Serialize)]
struct LevelVersion {
    #[serde(rename = "Name")]
    name: String,
}

/// What goes into a fixture world folder.
pub struct WorldFixture<'a> {
    pub version: Option<&'a str>,
    pub modded: bool,
    pub forge_data: bool,
    pub region_bytes: usize,
    pub with_region: bool,
}

impl Default for WorldFixture<'_> {
    fn default() -> Self {
        Self {
            version: Some("1.20.1"),
            modded: false,
            forge_data: false,
            region_bytes: 2048,
            with_region: true,
        }
    }
}

pub fn write_level_dat(dir: &Path, version: Option<&str>, modded: bool) {
    let level = LevelDat {
        data: LevelData {
            level_name: "world".to_string(),
            version: version.map(|name| LevelVersion {
                name: name.to_string(),
            }),
            was_modded: modded,
        },
    };
    let nbt = fastnbt::to_bytes(&level).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&nbt).unwrap();
    fs::write(dir.join("level.dat"), encoder.finish().unwrap()).unwrap();
}

pub fn write_world(dir: &Path, fixture: &WorldFixture<'_>) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    write_level_dat(dir, fixture.version, fixture.modded);
    if fixture.with_region {
        fs::create_dir_all(dir.join("region")).unwrap();
        fs::write(dir.join("region").join("r.0.0.mca"), vec![1u8; fixture.region_bytes]).unwrap();
    }
    fs::create_dir_all(dir.join("playerdata")).unwrap();
    fs::create_dir_all(dir.join("DIM-1").join("region")).unwrap();
    if fixture.forge_data {
        fs::create_dir_all(dir.join("data").join("forge")).unwrap();
    }
    dir.to_path_buf()
}

pub fn write_mods(dir: &Path, names: &[&str]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), format!("jar:{name}")).unwrap();
    }
    dir.to_path_buf()
}

pub fn write_modrinth_index(dir: &Path) {
    fs::write(
        dir.join("modrinth.index.json"),
        r#"{
            "dependencies": {"minecraft": "1.20.1", "fabric-loader": "0.15.7"},
            "files": [{"path": "mods/sodium.jar", "hashes": {"sha256": "00"}, "downloads": []}]
        }"#,
    )
    .unwrap();
}

pub fn write_curseforge_manifest(dir: &Path) {
    fs::write(
        dir.join("manifest.json"),
        r#"{
            "minecraft": {"version": "1.20.1", "modLoaders": [{"id": "forge-47.2.0", "primary": true}]},
            "files": [{"projectID": 1, "fileID": 2}]
        }"#,
    )
    .unwrap();
}

/// Zips the contents of `source` (not the folder itself) into `zip_path`.
pub fn zip_dir(source: &Path, zip_path: &Path) -> PathBuf {
    let mut writer = ZipWriter::new(File::create(zip_path).unwrap());
    let options = FileOptions::default();
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.unwrap();
        let relative = entry
            .path()
            .strip_prefix(source)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        if entry.file_type().is_dir() {
            writer.add_directory(relative, options).unwrap();
        } else {
            writer.start_file(relative, options).unwrap();
            writer.write_all(&fs::read(entry.path()).unwrap()).unwrap();
        }
    }
    writer.finish().unwrap();
    zip_path.to_path_buf()
}

#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<WizardEvent>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<WizardEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: WizardEvent) {
        self.events.lock().unwrap().push(event);
    }
}
