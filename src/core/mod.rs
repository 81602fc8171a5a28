pub mod install;
pub mod provision;
pub mod setup;
pub mod utils;

pub use install::{first_run, run_installer, Runner, SystemRunner};
pub use provision::Provisioner;
pub use setup::{accept_license, write_launch_script};
