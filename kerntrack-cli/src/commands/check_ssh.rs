use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use kerntrack_core::{Log, MemorySink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(config: Option<PathBuf>, log: &Log) -> Result<()> {
    let store = super::get_settings_store(config)?;
    let settings = store.load()?;
    let probe = settings.ssh_probe();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Contacting {}...", probe.target));
    spinner.enable_steady_tick(Duration::from_millis(100));

    // Buffer the probe's transcript so it does not race the spinner.
    let buffer = Arc::new(MemorySink::new());
    let result = probe.check(&Log::new(buffer.clone())).await;

    spinner.finish_and_clear();
    for event in buffer.events() {
        log.append(event);
    }

    result?;
    Ok(())
}
