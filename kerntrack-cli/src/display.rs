use anyhow::{Context, Result};
use colored::Colorize;
use kerntrack_core::log::render_html;
use kerntrack_core::{Error, LogEvent, LogLevel};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Render the transcript as it streams in. The task ends once every `Log`
/// handle has been dropped.
pub fn spawn(
    mut rx: UnboundedReceiver<LogEvent>,
    html_log: Option<PathBuf>,
    json: bool,
) -> Result<JoinHandle<Result<()>>> {
    let mut html = match html_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open HTML log {}", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    Ok(tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                println!("{}", terminal_line(&event));
            }
            if let Some(html) = html.as_mut() {
                write_html(html, &event)?;
            }
        }
        if let Some(mut html) = html {
            html.flush()?;
        }
        Ok::<(), anyhow::Error>(())
    }))
}

fn write_html(out: &mut BufWriter<File>, event: &LogEvent) -> Result<()> {
    writeln!(out, "{}<br>", render_html(event))?;
    Ok(())
}

fn terminal_line(event: &LogEvent) -> String {
    let text = match event.level {
        LogLevel::Info | LogLevel::Output => event.text.normal(),
        LogLevel::Error => event.text.red(),
        LogLevel::Success => event.text.green().bold(),
    };

    if event.timestamped {
        format!(
            "{} {}",
            format!("[{}]", event.timestamp.format("%H:%M:%S")).bright_black(),
            text
        )
    } else {
        text.to_string()
    }
}

/// Remediation advice for the failures a user can act on.
pub fn print_hints(error: &anyhow::Error) {
    let Some(error) = error.downcast_ref::<Error>() else {
        return;
    };

    eprintln!();
    match error {
        Error::ToolNotFound { program } if program == "git" => {
            eprintln!("{}", "Git was not found on this system.".red().bold());
            eprintln!(
                "Install Git: {}",
                kerntrack_core::clone::GIT_DOWNLOAD_URL.cyan()
            );
        }
        Error::ToolNotFound { program } => {
            eprintln!(
                "{}",
                format!("'{}' was not found on this system.", program).red().bold()
            );
            eprintln!("Install it and make sure it is on PATH.");
        }
        Error::SshAuthFailed { target, .. } => {
            eprintln!("{}", format!("Cannot authenticate to {}.", target).red().bold());
            eprintln!("Check that:");
            eprintln!("  • an SSH key exists ({})", "ls ~/.ssh/id_*.pub".cyan());
            eprintln!("  • the key is loaded in the agent ({})", "ssh-add -l".cyan());
            eprintln!("  • the public key is registered with the host");
            eprintln!("  • {} succeeds manually", format!("ssh -T {}", target).cyan());
        }
        Error::DeleteFailed { path, .. } => {
            eprintln!(
                "{}",
                format!("Could not delete {}.", path.display()).red().bold()
            );
            eprintln!("Close all programs using this folder and try again.");
        }
        Error::WorkdirMissing { path } => {
            eprintln!(
                "{}",
                format!("{} does not exist.", path.display()).red().bold()
            );
            eprintln!("Check the path, or run 'kerntrack clone' first.");
        }
        Error::StepFailed { command, .. } => {
            eprintln!("{} {}", "Failed command:".red().bold(), command);
        }
        _ => {}
    }
}
