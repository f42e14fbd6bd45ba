use crate::prompt::{self, TerminalConfirm};
use anyhow::Result;
use kerntrack_core::{
    CloneOrchestrator, CloneOutcome, Confirm, FixedAnswer, KnownRepo, Log, Trigger,
};
use std::path::PathBuf;
use tracing::debug;

pub async fn run(
    repo: KnownRepo,
    dir: Option<PathBuf>,
    yes: bool,
    config: Option<PathBuf>,
    log: &Log,
) -> Result<()> {
    let store = super::get_settings_store(config)?;
    let settings = store.load()?;
    let spec = settings.repo_spec(repo);

    let parent = match dir {
        Some(dir) => Some(dir),
        None => prompt::parent_directory(&spec.display),
    };

    let confirm: Box<dyn Confirm> = if yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(TerminalConfirm)
    };

    let orchestrator = CloneOrchestrator::new(spec, Trigger::new());
    let outcome = orchestrator
        .run(parent.as_deref(), confirm.as_ref(), log)
        .await?;

    if let CloneOutcome::Cloned(path) = outcome {
        debug!("Cloned into {:?}", path);
    }

    Ok(())
}
