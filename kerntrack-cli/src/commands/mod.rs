pub mod check_ssh;
pub mod clone;
pub mod identity;
pub mod push;
pub mod record;

use anyhow::{Context, Result};
use kerntrack_core::{Publisher, Settings, SettingsStore};
use std::path::PathBuf;

pub fn get_settings_store(custom_path: Option<PathBuf>) -> Result<SettingsStore> {
    let path = match custom_path {
        Some(path) => path,
        None => SettingsStore::default_path()?,
    };
    Ok(SettingsStore::new(path))
}

pub fn get_repo_path(custom_path: Option<PathBuf>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Cannot determine the current directory"),
    }
}

/// `remote: None` pushes to the upstream configured in the clone.
pub fn build_publisher(
    settings: &Settings,
    repo: PathBuf,
    remote: Option<String>,
    skip_ssh_check: bool,
) -> Publisher {
    let publisher = Publisher::new(repo, settings.ssh_probe())
        .with_remote(remote)
        .with_global_identity(settings.git.global_identity);

    if skip_ssh_check {
        publisher.without_precheck()
    } else {
        publisher
    }
}
