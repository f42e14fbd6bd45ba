use crate::prompt::TerminalIdentity;
use anyhow::Result;
use chrono::Local;
use kerntrack_core::config::resolve_identity;
use kerntrack_core::kernel::capture_identity;
use kerntrack_core::{Log, PushPolicy, Settings, TrackingFile};
use std::path::PathBuf;

pub async fn run(
    repo: Option<PathBuf>,
    no_push: bool,
    force_push: bool,
    skip_ssh_check: bool,
    config: Option<PathBuf>,
    log: &Log,
) -> Result<()> {
    let store = super::get_settings_store(config)?;
    let mut settings = store.load()?;
    let repo = super::get_repo_path(repo)?;

    if !repo.is_dir() {
        anyhow::bail!(
            "{} is not a directory. Run 'kerntrack clone uname' first.",
            repo.display()
        );
    }

    log.info("=== Recording kernel signature ===");
    log.blank();

    let kernel = capture_identity(settings.probe_timeout()).await?;

    let policy = if no_push {
        PushPolicy::Never
    } else if force_push {
        PushPolicy::Always
    } else {
        PushPolicy::IfAppended
    };

    let committer = if policy == PushPolicy::Never {
        None
    } else {
        let Some(committer) = resolve_identity(&store, &mut settings, &TerminalIdentity)? else {
            log.info("Operation cancelled by user.");
            return Ok(());
        };
        Some(committer)
    };

    let tracking = TrackingFile::new(repo.join(&settings.repos.tracking_file));
    let remote = push_remote(&settings);
    let publisher = super::build_publisher(&settings, repo, remote, skip_ssh_check);

    publisher
        .record_and_publish(
            &tracking,
            &kernel,
            committer.as_ref(),
            &Local::now(),
            policy,
            log,
        )
        .await?;

    Ok(())
}

pub fn push_remote(settings: &Settings) -> Option<String> {
    settings.repos.uname_push_remote.clone()
}
