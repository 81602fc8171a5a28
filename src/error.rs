use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error("Error downloading file: {0}")]
    DownloadError(#[from] ureq::Error),
    #[error("Error parsing JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error parsing config file {0:?}: {1}")]
    ConfigError(PathBuf, json5::Error),
    #[error("Latest release {0} is missing from the version manifest")]
    ManifestError(String),
    #[error("No tags returned from {0}")]
    MissingTag(String),
}
