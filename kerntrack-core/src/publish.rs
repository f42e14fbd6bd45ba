//! Commit and push of a local clone over SSH.

use crate::config::Identity;
use crate::error::{Error, Result};
use crate::exec::{self, Step};
use crate::kernel::{AppendOutcome, TrackingFile};
use crate::log::Log;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::probe::SshProbe;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const STATUS_TIMEOUT: Duration = Duration::from_secs(15);

/// When `record_and_publish` should push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPolicy {
    /// Only when a new record was appended.
    IfAppended,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub append: AppendOutcome,
    pub published: Option<PipelineReport>,
}

pub struct Publisher {
    repo_path: PathBuf,
    remote: Option<String>,
    probe: Option<SshProbe>,
    global_identity: bool,
    git: String,
}

impl Publisher {
    pub fn new(repo_path: impl Into<PathBuf>, probe: SshProbe) -> Self {
        Self {
            repo_path: repo_path.into(),
            remote: None,
            probe: Some(probe),
            global_identity: false,
            git: "git".to_string(),
        }
    }

    pub fn with_remote(mut self, remote: Option<String>) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_global_identity(mut self, global: bool) -> Self {
        self.global_identity = global;
        self
    }

    /// Skip the SSH pre-check, e.g. for HTTPS remotes with a credential helper.
    pub fn without_precheck(mut self) -> Self {
        self.probe = None;
        self
    }

    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git = program.into();
        self
    }

    pub fn identity_steps(&self, identity: &Identity) -> Vec<Step> {
        let config = |key: &str, value: &str| {
            let mut args = vec!["config".to_string()];
            if self.global_identity {
                args.push("--global".to_string());
            }
            args.push(key.to_string());
            args.push(value.to_string());
            Step::new(self.git.clone(), args)
        };

        vec![
            config("user.email", &identity.email),
            config("user.name", &identity.name),
        ]
    }

    /// The fixed `add`, `commit`, `push` sequence.
    pub fn commit_steps(&self, message: &str) -> Vec<Step> {
        let mut push = vec!["push".to_string()];
        push.extend(self.remote.clone());

        vec![
            Step::new(self.git.clone(), ["add", "--all"]),
            Step::new(self.git.clone(), ["commit", "-m", message]),
            Step::new(self.git.clone(), push),
        ]
    }

    pub async fn publish(
        &self,
        identity: &Identity,
        message: &str,
        log: &Log,
    ) -> Result<PipelineReport> {
        log.info(format!("=== Publishing {} ===", self.repo_path.display()));
        self.precheck(log).await?;
        self.commit_and_push(identity, message, log).await
    }

    async fn precheck(&self, log: &Log) -> Result<()> {
        match &self.probe {
            Some(probe) => probe.check(log).await,
            None => Ok(()),
        }
    }

    async fn commit_and_push(
        &self,
        identity: &Identity,
        message: &str,
        log: &Log,
    ) -> Result<PipelineReport> {
        log.info(format!("Committer: {} <{}>", identity.name, identity.email));
        Pipeline::new(&self.repo_path, self.identity_steps(identity))
            .run(log)
            .await?;

        let mut pipeline = Pipeline::new(&self.repo_path, self.commit_steps(message));
        let report = pipeline.run(log).await?;

        debug!(repo = %self.repo_path.display(), "published");
        log.success("Changes pushed.");
        Ok(report)
    }

    /// Whether `path` has changes git has not committed yet.
    pub async fn has_uncommitted_changes(&self, path: &Path) -> Result<bool> {
        let repo = self.repo_path.to_string_lossy();
        let file = path.to_string_lossy();
        let args = ["-C", repo.as_ref(), "status", "--porcelain", "--", file.as_ref()];

        let captured = exec::capture(&self.git, &args, STATUS_TIMEOUT).await?;
        if !captured.success() {
            return Err(Error::StepFailed {
                step: 1,
                command: format!("{} {}", self.git, args.join(" ")),
                code: captured.code,
                stderr: captured.stderr,
            });
        }
        Ok(!captured.stdout.trim().is_empty())
    }

    /// Append `kernel_identity` to `tracking` and publish per `policy`.
    ///
    /// The SSH pre-check runs before the file is touched. Without a
    /// `committer` the record is only appended.
    pub async fn record_and_publish(
        &self,
        tracking: &TrackingFile,
        kernel_identity: &str,
        committer: Option<&Identity>,
        now: &DateTime<Local>,
        policy: PushPolicy,
        log: &Log,
    ) -> Result<RecordOutcome> {
        log.info(format!("Kernel signature: {}", kernel_identity));

        let committer = match policy {
            PushPolicy::Never => None,
            _ => committer,
        };
        if committer.is_some() {
            self.precheck(log).await?;
        }

        let append = tracking.append_if_absent(kernel_identity, now)?;
        let file_name = tracking
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match &append {
            AppendOutcome::Appended(line) => {
                log.success(format!("Added to {}:", file_name));
                log.info(line.clone());
            }
            AppendOutcome::AlreadyPresent => {
                log.info(format!("Already recorded in {}.", file_name));
            }
        }

        let Some(committer) = committer else {
            log.info("Nothing to publish.");
            return Ok(RecordOutcome {
                append,
                published: None,
            });
        };

        let push = match (policy, &append) {
            (PushPolicy::IfAppended, AppendOutcome::AlreadyPresent) => {
                // A line left behind by an earlier failed push.
                let pending = self.has_uncommitted_changes(tracking.path()).await?;
                if pending {
                    log.info(format!("{} has unpublished changes.", file_name));
                }
                pending
            }
            _ => true,
        };
        if !push {
            log.info("Nothing to publish.");
            return Ok(RecordOutcome {
                append,
                published: None,
            });
        }

        log.info(format!("=== Publishing {} ===", self.repo_path.display()));
        let message = commit_message(kernel_identity);
        let report = self.commit_and_push(committer, &message, log).await?;
        Ok(RecordOutcome {
            append,
            published: Some(report),
        })
    }
}

/// `uname -a` prints the node name as its second field.
pub fn commit_message(kernel_identity: &str) -> String {
    let host = kernel_identity.split_whitespace().nth(1).unwrap_or("unknown");
    format!("Add kernel signature: {}", host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::log::MemorySink;
    use chrono::TimeZone;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const KERNEL: &str = "Linux host 5.15.0 x86_64 GNU/Linux";

    fn committer() -> Identity {
        Identity {
            email: "dev@example.com".to_string(),
            name: "Dev".to_string(),
        }
    }

    /// Stand-in git that records its arguments; `commit` fails when
    /// `fail_commit` is set, like git does with a clean tree. `-C <dir> status`
    /// is not recorded and prints the `status` file next to the script.
    fn fake_git(dir: &Path, fail_commit: bool) -> (PathBuf, PathBuf) {
        let calls = dir.join("calls");
        let status = dir.join("status");
        let script = dir.join("fake-git");
        let commit_exit = if fail_commit { 1 } else { 0 };
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nif [ \"$1\" = -C ]; then\n  cat '{}' 2>/dev/null\n  exit 0\nfi\necho \"$*\" >> '{}'\nif [ \"$1\" = commit ]; then\n  echo 'nothing to commit, working tree clean'\n  exit {}\nfi\nexit 0\n",
                status.display(),
                calls.display(),
                commit_exit
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script, calls)
    }

    fn calls(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn publisher(repo: &Path, git: &Path) -> Publisher {
        Publisher::new(repo, SshProbe::default())
            .without_precheck()
            .with_git_program(git.to_string_lossy())
    }

    #[test]
    fn test_commit_steps() {
        let publisher = Publisher::new("/repo", SshProbe::default())
            .with_remote(Some("origin".to_string()));
        let steps: Vec<String> = publisher
            .commit_steps("msg")
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(steps, vec!["git add --all", "git commit -m msg", "git push origin"]);
    }

    #[test]
    fn test_identity_steps_global() {
        let publisher = Publisher::new("/repo", SshProbe::default()).with_global_identity(true);
        let steps = publisher.identity_steps(&committer());

        assert_eq!(steps[0].to_string(), "git config --global user.email dev@example.com");
        assert_eq!(steps[1].to_string(), "git config --global user.name Dev");
    }

    #[test]
    fn test_commit_message_uses_host() {
        assert_eq!(commit_message(KERNEL), "Add kernel signature: host");
        assert_eq!(commit_message(""), "Add kernel signature: unknown");
    }

    #[tokio::test]
    async fn test_publish_runs_full_sequence() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        publisher(repo.path(), &git)
            .with_remote(Some("origin".to_string()))
            .publish(&committer(), "update", &log)
            .await
            .unwrap();

        assert_eq!(
            calls(&calls_path),
            vec![
                "config user.email dev@example.com",
                "config user.name Dev",
                "add --all",
                "commit -m update",
                "push origin",
            ]
        );
        assert!(sink.transcript().contains("Changes pushed."));
    }

    #[tokio::test]
    async fn test_failed_commit_never_pushes() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), true);
        let log = Log::new(Arc::new(MemorySink::new()));

        let err = publisher(repo.path(), &git)
            .publish(&committer(), "update", &log)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::StepFailed { step: 2, code: Some(1), .. }));
        let calls = calls(&calls_path);
        assert_eq!(calls.last().map(String::as_str), Some("commit -m update"));
        assert!(calls.contains(&"add --all".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test]
    async fn test_record_skips_publish_when_present() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        let tracking = TrackingFile::new(repo.path().join("uname.txt"));
        std::fs::write(
            tracking.path(),
            format!("{}  # Mon Jan 1 00:00:00 2024\n", KERNEL),
        )
        .unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        let outcome = publisher(repo.path(), &git)
            .record_and_publish(
                &tracking,
                KERNEL,
                Some(&committer()),
                &now,
                PushPolicy::IfAppended,
                &log,
            )
            .await
            .unwrap();

        assert_eq!(outcome.append, AppendOutcome::AlreadyPresent);
        assert!(outcome.published.is_none());
        assert!(calls(&calls_path).is_empty());
        assert!(sink.transcript().contains("Already recorded in uname.txt."));
    }

    #[tokio::test]
    async fn test_record_appends_and_publishes() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        let tracking = TrackingFile::new(repo.path().join("uname.txt"));
        let now = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let log = Log::new(Arc::new(MemorySink::new()));

        let outcome = publisher(repo.path(), &git)
            .record_and_publish(
                &tracking,
                KERNEL,
                Some(&committer()),
                &now,
                PushPolicy::IfAppended,
                &log,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.append,
            AppendOutcome::Appended(format!("{}  # Mon Jan 1 00:00:00 2024", KERNEL))
        );
        assert_eq!(outcome.published, Some(PipelineReport { steps_run: 3 }));
        assert!(calls(&calls_path).contains(&"commit -m Add kernel signature: host".to_string()));
    }

    #[tokio::test]
    async fn test_record_never_policy_only_appends() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        let tracking = TrackingFile::new(repo.path().join("uname.txt"));
        let now = Local::now();
        let log = Log::new(Arc::new(MemorySink::new()));

        let outcome = publisher(repo.path(), &git)
            .record_and_publish(
                &tracking,
                KERNEL,
                None,
                &now,
                PushPolicy::Never,
                &log,
            )
            .await
            .unwrap();

        assert!(matches!(outcome.append, AppendOutcome::Appended(_)));
        assert!(outcome.published.is_none());
        assert!(calls(&calls_path).is_empty());
        assert!(tracking.contains(KERNEL).unwrap());
    }

    #[tokio::test]
    async fn test_failed_ssh_check_leaves_tracking_file_untouched() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        let ssh = tools.path().join("fake-ssh");
        std::fs::write(&ssh, "#!/bin/sh\necho 'Permission denied (publickey).' >&2\nexit 255\n")
            .unwrap();
        std::fs::set_permissions(&ssh, std::fs::Permissions::from_mode(0o755)).unwrap();
        let tracking = TrackingFile::new(repo.path().join("uname.txt"));
        let log = Log::new(Arc::new(MemorySink::new()));

        let err = Publisher::new(repo.path(), SshProbe::default().with_program(ssh.to_string_lossy()))
            .with_git_program(git.to_string_lossy())
            .record_and_publish(
                &tracking,
                KERNEL,
                Some(&committer()),
                &Local::now(),
                PushPolicy::IfAppended,
                &log,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SshAuthFailed { .. }));
        assert!(!tracking.path().exists());
        assert!(calls(&calls_path).is_empty());
    }

    #[tokio::test]
    async fn test_record_publishes_line_left_by_failed_push() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        std::fs::write(tools.path().join("status"), " M uname.txt\n").unwrap();
        let tracking = TrackingFile::new(repo.path().join("uname.txt"));
        std::fs::write(
            tracking.path(),
            format!("{}  # Mon Jan 1 00:00:00 2024\n", KERNEL),
        )
        .unwrap();
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        let outcome = publisher(repo.path(), &git)
            .record_and_publish(
                &tracking,
                KERNEL,
                Some(&committer()),
                &Local::now(),
                PushPolicy::IfAppended,
                &log,
            )
            .await
            .unwrap();

        assert_eq!(outcome.append, AppendOutcome::AlreadyPresent);
        assert_eq!(outcome.published, Some(PipelineReport { steps_run: 3 }));
        assert!(calls(&calls_path).contains(&"push".to_string()));
        assert!(sink.transcript().contains("uname.txt has unpublished changes."));
    }

    #[tokio::test]
    async fn test_record_without_committer_only_appends() {
        let tools = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let (git, calls_path) = fake_git(tools.path(), false);
        let tracking = TrackingFile::new(repo.path().join("uname.txt"));
        let log = Log::new(Arc::new(MemorySink::new()));

        let outcome = publisher(repo.path(), &git)
            .record_and_publish(
                &tracking,
                KERNEL,
                None,
                &Local::now(),
                PushPolicy::Always,
                &log,
            )
            .await
            .unwrap();

        assert!(matches!(outcome.append, AppendOutcome::Appended(_)));
        assert!(outcome.published.is_none());
        assert!(calls(&calls_path).is_empty());
    }
}
