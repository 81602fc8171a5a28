use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{error::ProvisionError, CONFIG_FILE, SCRATCH_DIR, SERVERS_DIR};

const VERSION_MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";
const FORGE_TAGS_URL: &str = "https://api.github.com/repos/MinecraftForge/MinecraftForge/tags";
const FORGE_INSTALLER_URL: &str = "https://maven.minecraftforge.net/net/minecraftforge/forge/{mc}-{loader}/forge-{mc}-{loader}-installer.jar";

/// Extra request headers for a download
pub type Headers = BTreeMap<String, String>;

/// Process-wide settings, built once at startup and never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root that `servers/`, `tmp/` and `config/` live under
    pub base_dir: PathBuf,
    pub manifest_url: String,
    pub tags_url: String,
    /// Installer location with `{mc}` and `{loader}` placeholders
    pub installer_url_template: String,
    /// Executable used for both the installer and the server itself
    pub java: String,
    /// Sent to the installer host, which turns away default clients
    pub user_agent: String,
}

impl Settings {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            manifest_url: VERSION_MANIFEST_URL.into(),
            tags_url: FORGE_TAGS_URL.into(),
            installer_url_template: FORGE_INSTALLER_URL.into(),
            java: "java".into(),
            user_agent: "Mozilla/5.0".into(),
        }
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.base_dir.join(SERVERS_DIR)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.base_dir.join(SCRATCH_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    pub fn installer_headers(&self) -> Headers {
        Headers::from([("User-Agent".to_string(), self.user_agent.clone())])
    }
}

// config/config.json

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Heap bounds handed to the JVM, e.g. `"1024M"`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    #[serde(default = "default_memory")]
    pub min: String,
    #[serde(default = "default_memory")]
    pub max: String,
}

fn default_memory() -> String {
    "1024M".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            min: default_memory(),
            max: default_memory(),
        }
    }
}

impl Config {
    /// Load the config file at `path`, falling back to the defaults if it doesn't exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProvisionError> {
        let path = path.as_ref();
        if !path.try_exists()? {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        json5::from_str(&raw).map_err(|e| ProvisionError::ConfigError(path.to_path_buf(), e))
    }
}

// Remote documents

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionManifest {
    pub latest: Latest,
    pub versions: Vec<VersionEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Latest {
    pub release: String,
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionEntry {
    pub id: String,
    pub url: String,
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

/// Per-version metadata, only the parts needed to find the server jar
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VersionMeta {
    pub downloads: Downloads,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Downloads {
    pub server: Download,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Download {
    pub url: String,
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tag {
    pub name: String,
    #[serde(flatten)]
    pub _extra: HashMap<String, Value>,
}

/// A resolved release and where to find its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub id: String,
    pub url: String,
}

/// Exit state of an external process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// `None` if the process was killed by a signal
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Which provisioning flow to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Vanilla,
    Forge,
}

impl Flavor {
    /// Map an answer to the selection prompt
    ///
    /// Only the line terminator is ignored, anything other than `1` or `2` is rejected
    pub fn from_choice(input: impl AsRef<str>) -> Option<Self> {
        match input.as_ref().trim_end_matches(['\r', '\n']) {
            "1" => Some(Self::Vanilla),
            "2" => Some(Self::Forge),
            _ => None,
        }
    }
}
