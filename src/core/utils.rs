use std::fs::{self, File};
use std::io::{Read, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use tracing::{debug, error, trace};

use crate::error::ProvisionError;

/// Directory that is removed, with everything in it, when dropped
pub struct ScratchDir {
    pub path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        fs::create_dir_all(path.as_ref())?;
        Ok(ScratchDir {
            path: path.as_ref().to_path_buf(),
        })
    }
}

impl Deref for ScratchDir {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        debug!("Removing scratch directory {}", self.path.display());
        if let Err(e) = fs::remove_dir_all(&self.path) {
            error!(
                "Error removing scratch directory at '{}': {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Stream a response body to a file, calling `cb` after every chunk
/// # Params
/// * res - response to read the body from
/// * file_path - full path to save the file to, truncated if it exists
/// * cb - called with `(delta, current, total)`, `total` is 0 if the length is unknown
///
/// A failure partway through leaves a truncated file behind
pub fn download_file_with_progress<F>(
    res: ureq::Response,
    file_path: impl AsRef<Path>,
    mut cb: F,
) -> Result<u64, ProvisionError>
where
    F: FnMut(u64, u64, u64),
{
    let file_path = file_path.as_ref();
    let total = res
        .header("Content-Length")
        .and_then(|len| len.parse::<u64>().ok())
        .unwrap_or(0);
    debug!("Downloading {} bytes to {}", total, file_path.display());

    let mut reader = res.into_reader();
    let mut file = File::create(file_path)?;
    copy_with_progress(&mut reader, &mut file, total, &mut cb)
}

fn copy_with_progress<F>(
    reader: &mut impl Read,
    writer: &mut impl Write,
    total: u64,
    cb: &mut F,
) -> Result<u64, ProvisionError>
where
    F: FnMut(u64, u64, u64),
{
    let mut buf = [0u8; 8192];
    let mut downloaded = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        downloaded += n as u64;
        trace!("Wrote chunk of {} bytes", n);
        cb(n as u64, downloaded, total);
    }
    writer.flush()?;

    Ok(downloaded)
}

/// Move `from` to `to` if `from` exists, replacing `to`
///
/// Returns whether anything was moved
pub fn rename_if_exists(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
) -> Result<bool, ProvisionError> {
    let (from, to) = (from.as_ref(), to.as_ref());
    if !from.try_exists()? {
        debug!("Nothing to move at {}", from.display());
        return Ok(false);
    }

    debug!("Moving {} to {}", from.display(), to.display());
    if let Err(e) = fs::rename(from, to) {
        //rename can't cross filesystems, fall back to a copy
        debug!("Rename failed ({}), copying instead", e);
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }

    Ok(true)
}
