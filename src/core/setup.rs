use std::{fs, path::Path};

use tracing::{debug, info};

use crate::{error::ProvisionError, model::MemoryConfig, START_SCRIPT};

const EULA_DISABLED: &str = "eula=false";
const EULA_ENABLED: &str = "eula=true";

/// What `accept_license` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseState {
    /// The flag was flipped
    Accepted,
    /// The file had no disabled flag to flip
    AlreadyAccepted,
    /// The file doesn't exist (yet)
    Missing,
}

/// Flip `eula=false` to `eula=true` in the file at `path`
///
/// Does nothing if the file doesn't exist
pub fn accept_license(path: impl AsRef<Path>) -> Result<LicenseState, ProvisionError> {
    let path = path.as_ref();
    if !path.try_exists()? {
        debug!("No license file at {}", path.display());
        return Ok(LicenseState::Missing);
    }

    let raw = fs::read_to_string(path)?;
    if !raw.contains(EULA_DISABLED) {
        debug!("License at {} needs no change", path.display());
        return Ok(LicenseState::AlreadyAccepted);
    }

    fs::write(path, raw.replace(EULA_DISABLED, EULA_ENABLED))?;
    info!("Accepted license at {}", path.display());
    Ok(LicenseState::Accepted)
}

/// Script contents for the given heap bounds
pub fn launch_script(memory: &MemoryConfig) -> String {
    [
        "@echo off".to_string(),
        String::new(),
        "cd /d %~dp0".into(),
        "setlocal".into(),
        String::new(),
        format!("java -Xmx{} -Xms{} -jar server.jar nogui", memory.max, memory.min),
        String::new(),
        "endlocal".into(),
        String::new(),
        "pause".into(),
        String::new(),
    ]
    .join("\r\n")
}

/// Write the launch script into `dir`, overwriting any previous one
pub fn write_launch_script(
    dir: impl AsRef<Path>,
    memory: &MemoryConfig,
) -> Result<(), ProvisionError> {
    let path = dir.as_ref().join(START_SCRIPT);
    fs::write(&path, launch_script(memory))?;
    info!("Wrote launch script to {}", path.display());
    Ok(())
}
