use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info, warn};

use crate::{
    core::setup::{self, LicenseState},
    error::ProvisionError,
    model::{MemoryConfig, RunStatus},
    EULA_FILE, SERVER_JAR,
};

/// Runs external programs to completion
#[cfg_attr(test, mockall::automock)]
pub trait Runner {
    /// Run `program` with `args` inside `cwd`, blocking until it exits
    fn run(&self, program: &str, args: &[OsString], cwd: &Path)
        -> Result<RunStatus, ProvisionError>;
}

/// [`Runner`] that spawns real processes with inherited stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        cwd: &Path,
    ) -> Result<RunStatus, ProvisionError> {
        let status = Command::new(program).args(args).current_dir(cwd).status()?;
        Ok(RunStatus {
            code: status.code(),
        })
    }
}

/// Run an installer or server in `working_dir` and wait for it to exit
///
/// A non-zero exit is logged and handed back, it's up to the caller to care
pub fn run_installer(
    runner: &impl Runner,
    executable: &str,
    args: &[OsString],
    working_dir: impl AsRef<Path>,
) -> Result<RunStatus, ProvisionError> {
    let working_dir = working_dir.as_ref();
    let shown: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
    info!("Running {} {} in {}", executable, shown.join(" "), working_dir.display());
    let status = runner.run(executable, args, working_dir)?;
    if status.success() {
        debug!("{} exited successfully", executable);
    } else {
        warn!("{} exited with {:?}", executable, status.code);
    }

    Ok(status)
}

/// Arguments that start the server jar with the configured heap bounds
pub fn server_args(memory: &MemoryConfig) -> Vec<OsString> {
    vec![
        format!("-Xmx{}", memory.max).into(),
        format!("-Xms{}", memory.min).into(),
        "-jar".into(),
        SERVER_JAR.into(),
        "nogui".into(),
    ]
}

/// Proof that the server has been started once in `dir`
///
/// The first start is what writes the license file, so accepting it goes through here
#[derive(Debug, Clone)]
pub struct FirstRun {
    pub dir: PathBuf,
    pub status: RunStatus,
}

impl FirstRun {
    pub fn accept_license(&self) -> Result<LicenseState, ProvisionError> {
        setup::accept_license(self.dir.join(EULA_FILE))
    }
}

/// Start the installed server once so it generates its files
pub fn first_run(
    runner: &impl Runner,
    java: &str,
    dir: impl AsRef<Path>,
    memory: &MemoryConfig,
) -> Result<FirstRun, ProvisionError> {
    let dir = dir.as_ref();
    let status = run_installer(runner, java, &server_args(memory), dir)?;
    Ok(FirstRun {
        dir: dir.to_path_buf(),
        status,
    })
}
