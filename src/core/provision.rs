use std::{ffi::OsString, fs, path::PathBuf};

use tracing::{debug, info, warn};

use crate::{
    api::{self, Remote},
    core::{
        install::{self, Runner},
        setup::{self, LicenseState},
        utils::{self, ScratchDir},
    },
    error::ProvisionError,
    model::{Config, Flavor, Headers, Settings},
    INSTALLER_JAR, SERVER_JAR,
};

/// Everything a provisioning run needs
///
/// Both flows are plain methods over the same settings, config and seams
pub struct Provisioner<R, X> {
    pub settings: Settings,
    pub config: Config,
    remote: R,
    runner: X,
}

impl<R: Remote, X: Runner> Provisioner<R, X> {
    pub fn new(settings: Settings, config: Config, remote: R, runner: X) -> Self {
        Self {
            settings,
            config,
            remote,
            runner,
        }
    }

    /// Run the flow for `flavor`, returning the installation directory
    pub fn provision(&self, flavor: Flavor) -> Result<PathBuf, ProvisionError> {
        match flavor {
            Flavor::Vanilla => self.vanilla(),
            Flavor::Forge => self.forge(),
        }
    }

    /// Install the latest official server into `servers/<release>`
    pub fn vanilla(&self) -> Result<PathBuf, ProvisionError> {
        let release = api::resolve_latest_base_version(&self.remote, &self.settings.manifest_url)?;
        info!("Latest release is {}", release.id);
        let meta = api::get_version_meta(&self.remote, &release.url)?;

        let dir = self.settings.servers_dir().join(&release.id);
        fs::create_dir_all(&dir)?;

        let jar = dir.join(SERVER_JAR);
        info!("Downloading server {}", release.id);
        self.remote
            .download_file(&meta.downloads.server.url, &jar, &Headers::new())?;

        self.finish(dir)
    }

    /// Install the latest Forge server for the latest release into `servers/forge-<release>`
    pub fn forge(&self) -> Result<PathBuf, ProvisionError> {
        let release = api::resolve_latest_base_version(&self.remote, &self.settings.manifest_url)?;
        let loader = api::resolve_latest_loader_tag(&self.remote, &self.settings.tags_url)?;
        info!("Latest release is {}, latest Forge is {}", release.id, loader);

        let url = api::installer_url(&self.settings.installer_url_template, &release.id, &loader);
        let dir = self.settings.servers_dir().join(format!("forge-{}", release.id));
        fs::create_dir_all(&dir)?;

        {
            let scratch = ScratchDir::create(self.settings.scratch_dir())?;
            let installer = scratch.join(INSTALLER_JAR);
            info!("Downloading Forge installer {}", loader);
            self.remote
                .download_file(&url, &installer, &self.settings.installer_headers())?;

            let args = [
                OsString::from("-jar"),
                installer.clone().into_os_string(),
                OsString::from("--installServer"),
            ];
            install::run_installer(&self.runner, &self.settings.java, &args, &dir)?;

            utils::rename_if_exists(&installer, dir.join(INSTALLER_JAR))?;
            let shim = dir.join(format!("forge-{}-{}-shim.jar", release.id, loader));
            if utils::rename_if_exists(&shim, dir.join(SERVER_JAR))? {
                debug!("Renamed {} to {}", shim.display(), SERVER_JAR);
            } else {
                warn!("Installer produced no {}", shim.display());
            }
            // scratch is removed here, whatever the installer did
        }

        self.finish(dir)
    }

    /// Start the server once, accept its license and write the launch script
    fn finish(&self, dir: PathBuf) -> Result<PathBuf, ProvisionError> {
        let memory = &self.config.server.memory;
        let run = install::first_run(&self.runner, &self.settings.java, &dir, memory)?;
        if run.accept_license()? == LicenseState::Missing {
            warn!("Server didn't create a license file in {}", dir.display());
        }
        setup::write_launch_script(&dir, memory)?;

        info!("Server ready in {}", dir.display());
        Ok(dir)
    }
}
