use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{program}' was not found on PATH")]
    ToolNotFound { program: String },

    #[error("Working directory {} does not exist", .path.display())]
    WorkdirMissing { path: PathBuf },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step {step} ({command}) failed{}: {}", exit_suffix(.code), .stderr.trim())]
    StepFailed {
        /// 1-based position of the failing step.
        step: usize,
        command: String,
        /// `None` when the tool was terminated by a signal.
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("SSH authentication to {target} failed")]
    SshAuthFailed { target: String, output: String },

    #[error("Failed to delete {}: {source}", .path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("uname returned an empty kernel identity")]
    EmptyIdentity,

    #[error("Operation already in progress")]
    Busy,

    #[error("Invalid settings file {}: {source}", .path.display())]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    SettingsWrite(#[from] toml::ser::Error),

    #[error("Could not determine a configuration directory (HOME is not set)")]
    ConfigDir,
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " abnormally".to_string(),
    }
}
