//! Persisted settings.
//!
//! Settings are loaded once by the shell and threaded through by reference;
//! nothing in the library reads them from ambient state.

use crate::error::{Error, Result};
use crate::probe::{self, SshProbe};
use crate::repos::{KnownRepo, RepoSpec, SSD_URL, UNAME_PUSH_REMOTE, UNAME_URL};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoSettings {
    pub ssd_url: String,
    pub uname_url: String,
    /// Remote `git push` targets in the uname clone.
    pub uname_push_remote: Option<String>,
    /// Tracking file name inside the uname clone.
    pub tracking_file: String,
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            ssd_url: SSD_URL.to_string(),
            uname_url: UNAME_URL.to_string(),
            uname_push_remote: Some(UNAME_PUSH_REMOTE.to_string()),
            tracking_file: "uname.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub target: String,
    pub timeout_secs: u64,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            target: probe::DEFAULT_TARGET.to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// Write the committer identity with `git config --global`.
    pub global_identity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bounded wait for `uname -a`.
    pub probe_timeout_secs: u64,
    pub identity: Option<Identity>,
    pub repos: RepoSettings,
    pub ssh: SshSettings,
    pub git: GitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 5,
            identity: None,
            repos: RepoSettings::default(),
            ssh: SshSettings::default(),
            git: GitSettings::default(),
        }
    }
}

impl Settings {
    pub fn repo_spec(&self, repo: KnownRepo) -> RepoSpec {
        let url = match repo {
            KnownRepo::Ssd => &self.repos.ssd_url,
            KnownRepo::Uname => &self.repos.uname_url,
        };
        RepoSpec::new(url.clone(), repo.folder(), repo.display_name())
    }

    pub fn ssh_probe(&self) -> SshProbe {
        SshProbe::new(
            self.ssh.target.clone(),
            Duration::from_secs(self.ssh.timeout_secs),
        )
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Asks the user for a committer identity.
pub trait IdentityPrompt {
    /// `None` when the user backed out.
    fn ask(&self) -> Option<Identity>;
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/kerntrack/settings.toml`, falling back to
    /// `$HOME/.config/kerntrack/settings.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".config"))
                .ok_or(Error::ConfigDir)?,
        };
        Ok(base.join("kerntrack").join("settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map_err(|source| Error::SettingsRead {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Return the cached identity, or ask once and persist the answer.
pub fn resolve_identity(
    store: &SettingsStore,
    settings: &mut Settings,
    prompt: &dyn IdentityPrompt,
) -> Result<Option<Identity>> {
    if let Some(identity) = &settings.identity {
        return Ok(Some(identity.clone()));
    }

    let Some(identity) = prompt.ask() else {
        return Ok(None);
    };
    settings.identity = Some(identity.clone());
    store.save(settings)?;
    Ok(Some(identity))
}
