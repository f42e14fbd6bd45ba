use crate::prompt::TerminalIdentity;
use anyhow::Result;
use chrono::Local;
use kerntrack_core::config::resolve_identity;
use kerntrack_core::Log;
use std::path::PathBuf;

pub async fn run(
    repo: Option<PathBuf>,
    message: Option<String>,
    remote: Option<String>,
    skip_ssh_check: bool,
    config: Option<PathBuf>,
    log: &Log,
) -> Result<()> {
    let store = super::get_settings_store(config)?;
    let mut settings = store.load()?;
    let repo = super::get_repo_path(repo)?;

    let Some(committer) = resolve_identity(&store, &mut settings, &TerminalIdentity)? else {
        log.info("Operation cancelled by user.");
        return Ok(());
    };

    let message = message
        .unwrap_or_else(|| format!("Update {}", Local::now().format("%Y-%m-%d %H:%M:%S")));

    super::build_publisher(&settings, repo, remote, skip_ssh_check)
        .publish(&committer, &message, log)
        .await?;

    Ok(())
}
