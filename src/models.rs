use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    Vanilla,
    Paper,
    Forge,
    Fabric,
}

impl ServerType {
    pub fn loader_label(&self) -> &'static str {
        match self {
            ServerType::Forge => "forge",
            ServerType::Fabric => "fabric",
            _ => "none",
        }
    }
}

/// Whether a picked path is a plain directory or a `.zip` archive.
///
/// The backend spells the archive kind `"zip"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    #[serde(rename = "folder")]
    Folder,
    #[serde(rename = "zip", alias = "archive")]
    Archive,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Folder => "folder",
            SourceKind::Archive => "zip",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectedType {
    Vanilla,
    Forge,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectedPack {
    Modrinth,
    Curseforge,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Vanilla,
    Forge,
    Fabric,
}

impl From<Loader> for ServerType {
    fn from(loader: Loader) -> Self {
        match loader {
            Loader::Vanilla => ServerType::Vanilla,
            Loader::Forge => ServerType::Forge,
            Loader::Fabric => ServerType::Fabric,
        }
    }
}

/// Where the world being migrated currently lives.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostingSource {
    Aternos,
    Minehut,
    Other,
    Zip,
}

impl HostingSource {
    pub const ALL: [HostingSource; 4] = [
        HostingSource::Aternos,
        HostingSource::Minehut,
        HostingSource::Other,
        HostingSource::Zip,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HostingSource::Aternos => "Aternos",
            HostingSource::Minehut => "Minehut",
            HostingSource::Other => "Other host",
            HostingSource::Zip => "World archive (.zip)",
        }
    }

    /// Export steps shown on the Instructions step.
    pub fn instructions(&self) -> &'static [&'static str] {
        match self {
            HostingSource::Aternos => &[
                "Stop your server on Aternos.",
                "Open Worlds and use Download on the world you want to keep.",
                "If the server runs mods, download the mods folder from Files as well.",
            ],
            HostingSource::Minehut => &[
                "Stop your server on Minehut.",
                "Open the File Manager and download the world folder as a .zip.",
                "Download the mods folder too if the server is modded.",
            ],
            HostingSource::Other => &[
                "Stop the server on your current host.",
                "Download the world folder (the one containing level.dat) over FTP or the host's file manager.",
                "Download the mods folder or modpack archive if the server is modded.",
            ],
            HostingSource::Zip => &[
                "Pick the .zip that contains your world.",
                "The archive must contain level.dat and a region folder, either at the top or inside a single folder.",
            ],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldValidationResult {
    pub valid: bool,
    pub source_kind: SourceKind,
    pub world_name: String,
    pub world_path: String,
    #[serde(default)]
    pub staged_path: Option<String>,
    pub size_bytes: u64,
    pub has_level_dat: bool,
    pub has_region: bool,
    pub has_playerdata: bool,
    pub has_data: bool,
    pub has_dim_nether: bool,
    pub has_dim_end: bool,
    pub detected_version: Option<String>,
    pub detected_type: Option<DetectedType>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModsValidationResult {
    pub valid: bool,
    pub source_kind: SourceKind,
    pub mods_path: String,
    #[serde(default)]
    pub staged_path: Option<String>,
    pub mod_count: usize,
    pub detected_pack: Option<DetectedPack>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MigrationDetection {
    pub loader: Loader,
    pub version: Option<String>,
    pub modded: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ModComparison {
    pub mismatch: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldImportPayload {
    #[serde(alias = "sourcePath")]
    pub source_path: String,
    #[serde(alias = "sourceKind")]
    pub source_kind: SourceKind,
    #[serde(default, alias = "stagedPath")]
    pub staged_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModsImportPayload {
    #[serde(alias = "sourcePath")]
    pub source_path: String,
    #[serde(alias = "sourceKind")]
    pub source_kind: SourceKind,
    #[serde(default, alias = "stagedPath")]
    pub staged_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationCreatePayload {
    pub name: String,
    #[serde(alias = "server_type")]
    pub server_type: ServerType,
    pub version: String,
    #[serde(alias = "ram_gb")]
    pub ram_gb: u32,
    #[serde(alias = "online_mode")]
    pub online_mode: bool,
    pub port: u16,
    #[serde(alias = "world_import")]
    pub world_import: WorldImportPayload,
    #[serde(default, alias = "mod_import")]
    pub mod_import: Option<ModsImportPayload>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    pub server_type: ServerType,
    pub version: String,
    pub ram_gb: u32,
    pub online_mode: bool,
    pub port: u16,
    pub server_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ServerRegistry {
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldCopyProgress {
    pub server_name: String,
    pub total_bytes: u64,
    pub copied_bytes: u64,
    pub percent: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModpackEntry {
    pub id: String,
    pub version: String,
    pub sha256: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModpackManifest {
    #[serde(rename = "mcVersion")]
    pub mc_version: String,
    pub loader: String,
    pub mods: Vec<ModpackEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ServerMetadata {
    pub loader: String,
    #[serde(rename = "mcVersion")]
    pub mc_version: String,
    #[serde(rename = "modCount")]
    pub mod_count: usize,
    #[serde(rename = "moddedWorld")]
    pub modded_world: bool,
    pub modpack: Option<DetectedPack>,
    #[serde(rename = "detectedAt")]
    pub detected_at: String,
}
