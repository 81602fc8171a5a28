use std::{
    cell::RefCell,
    env,
    io::{self, BufRead, Write},
    process::ExitCode,
    rc::Rc,
};

use indicatif::{ProgressBar, ProgressStyle};
use mcprovision::prelude::*;
use tracing::error;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "Choose a server type:
1) Vanilla (Official)
2) Forge

Type a number: ";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let flavor = match prompt() {
        Ok(Some(f)) => f,
        Ok(None) => {
            eprintln!("Unknown server type.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Unable to read selection: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(flavor) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn prompt() -> Result<Option<Flavor>, io::Error> {
    let mut stdout = io::stdout();
    stdout.write_all(PROMPT.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(Flavor::from_choice(line))
}

fn run(flavor: Flavor) -> Result<(), ProvisionError> {
    let settings = Settings::new(env::current_dir()?);
    let config = Config::load(settings.config_path())?;

    let progress = Rc::new(DownloadProgress::default());
    let hook = progress.clone();
    let remote = UreqRemote::new().with_progress(move |d, c, t| hook.update(d, c, t));

    let provisioner = Provisioner::new(settings, config, remote, SystemRunner);
    let res = provisioner.provision(flavor);
    // downloads without a length never reach their total
    progress.finish();
    res.map(|_| ())
}

/// One bar per download, replaced when the next download starts
#[derive(Default)]
struct DownloadProgress {
    bar: RefCell<Option<ProgressBar>>,
}

impl DownloadProgress {
    fn update(&self, delta: u64, current: u64, total: u64) {
        if current == delta {
            self.finish();
        }
        let mut bar = self.bar.borrow_mut();
        bar.get_or_insert_with(|| progress_bar(total)).inc(delta);
        if total > 0 && current >= total {
            if let Some(done) = bar.take() {
                done.finish_and_clear();
            }
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }

    #[cfg(test)]
    fn is_active(&self) -> bool {
        self.bar.borrow().is_some()
    }
}

fn progress_bar(total: u64) -> ProgressBar {
    if total == 0 {
        return ProgressBar::new_spinner().with_message("Downloading");
    }

    ProgressBar::new(total)
        .with_style(
            ProgressStyle::default_bar()
                .progress_chars("->.")
                .template("{msg} {wide_bar} {bytes}/{total_bytes}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
        .with_message("Downloading")
}
