//! Shallow clone of a repository into a user-chosen parent directory.

use crate::error::{Error, Result};
use crate::exec::{self, Completion, Step};
use crate::log::Log;
use crate::repos::RepoSpec;
use crate::trigger::Trigger;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const GIT_DOWNLOAD_URL: &str = "https://git-scm.com/downloads";

/// Asks the user whether an existing folder may be deleted.
pub trait Confirm {
    fn confirm_replace(&self, path: &Path) -> bool;
}

/// Answers every question the same way. Used for `--yes` and in tests.
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm_replace(&self, _path: &Path) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned(PathBuf),
    Cancelled,
}

pub struct CloneOrchestrator {
    spec: RepoSpec,
    trigger: Trigger,
    git: String,
}

impl CloneOrchestrator {
    pub fn new(spec: RepoSpec, trigger: Trigger) -> Self {
        Self {
            spec,
            trigger,
            git: "git".to_string(),
        }
    }

    /// Use a different git executable (name on PATH or absolute path).
    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git = program.into();
        self
    }

    pub fn clone_step(&self) -> Step {
        Step::new(
            self.git.clone(),
            [
                "clone",
                "--depth=1",
                self.spec.url.as_str(),
                self.spec.folder.as_str(),
            ],
        )
    }

    /// Clone into `parent_dir/<folder>`. `None` means the user dismissed the
    /// directory prompt.
    pub async fn run(
        &self,
        parent_dir: Option<&Path>,
        confirm: &dyn Confirm,
        log: &Log,
    ) -> Result<CloneOutcome> {
        let _guard = self.trigger.disable()?;

        log.info(format!("=== Cloning repository {} ===", self.spec.display));
        log.blank();

        let Some(parent) = parent_dir else {
            log.info("Operation cancelled by user.");
            return Ok(CloneOutcome::Cancelled);
        };
        let target = parent.join(&self.spec.folder);

        log.info(format!("Selected folder: {}", parent.display()));
        log.info(format!("Repository will be cloned into: {}", target.display()));
        log.blank();

        if target.exists() {
            if !confirm.confirm_replace(&target) {
                log.info("Clone cancelled by user.");
                return Ok(CloneOutcome::Cancelled);
            }

            log.info(format!("Removing existing folder {}...", self.spec.folder));
            if let Err(source) = std::fs::remove_dir_all(&target) {
                warn!(path = %target.display(), error = %source, "failed to remove folder");
                log.error(format!(
                    "Error: could not delete folder {}!",
                    self.spec.folder
                ));
                log.info("The folder may be in use by another process, or permissions are missing.");
                return Err(Error::DeleteFailed {
                    path: target,
                    source,
                });
            }
            log.info(format!("Existing folder {} removed.", self.spec.folder));
        }

        let step = self.clone_step();
        log.info("Running command:");
        log.info(step.to_string());
        log.info("Please wait...");
        log.blank();

        let completion = match exec::run_streaming(parent, &step, log).await {
            Ok(completion) => completion,
            Err(Error::ToolNotFound { program }) => {
                log.error("Critical error: Git not found!");
                log.info(format!(
                    "Make sure Git is installed and on PATH: {}",
                    GIT_DOWNLOAD_URL
                ));
                return Err(Error::ToolNotFound { program });
            }
            Err(e) => {
                log.error(e.to_string());
                return Err(e);
            }
        };

        log.blank();
        let (code, stderr) = match completion {
            Completion::Success => {
                debug!(url = %self.spec.url, path = %target.display(), "clone succeeded");
                log.success("Repository cloned successfully!");
                log.info(format!("Path: {}", target.display()));
                log.info(format!("Ready to work with {}!", self.spec.display));
                return Ok(CloneOutcome::Cloned(target));
            }
            Completion::Exit { code, stderr } => {
                log.error(format!("Clone failed (exit code: {})", code));
                (Some(code), stderr)
            }
            Completion::Abnormal { stderr } => {
                log.error("Clone failed (git terminated abnormally)");
                (None, stderr)
            }
        };
        log.info("Check your internet connection and that Git is installed.");

        Err(Error::StepFailed {
            step: 1,
            command: step.to_string(),
            code,
            stderr,
        })
    }
}
