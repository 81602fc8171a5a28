pub mod api;
pub mod core;
pub mod error;
pub mod model;

// Fixed names, not settings. `Settings` resolves the directories against its base dir.

/// Holds one directory per installation
pub const SERVERS_DIR: &str = "servers";
/// Staging area for the Forge installer, removed after every run
pub const SCRATCH_DIR: &str = "tmp";
pub const CONFIG_FILE: &str = "config/config.json";
/// Name the launch script and the first start expect the server jar under
pub const SERVER_JAR: &str = "server.jar";
pub const INSTALLER_JAR: &str = "server-installer.jar";
/// Written by the server itself on first start
pub const EULA_FILE: &str = "eula.txt";
pub const START_SCRIPT: &str = "start_server.bat";

pub mod prelude {
    pub use crate::api::{
        installer_url, normalize_tag, resolve_latest_base_version, resolve_latest_loader_tag,
        Remote, UreqRemote,
    };
    pub use crate::core::{
        accept_license, first_run, run_installer, write_launch_script, Provisioner, Runner,
        SystemRunner,
    };
    pub use crate::error::ProvisionError;
    pub use crate::model::{Config, Flavor, MemoryConfig, RunStatus, Settings};
}
