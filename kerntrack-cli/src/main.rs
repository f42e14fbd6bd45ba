use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use kerntrack_core::{ChannelSink, KnownRepo, Log};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod display;
mod prompt;

use commands::{check_ssh, clone, identity, push, record};

#[derive(Parser, Debug)]
#[command(name = "kerntrack")]
#[command(version, about = "Clone, record and publish kernel signatures", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/kerntrack/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also append the transcript as HTML to this file
    #[arg(long, global = true)]
    html_log: Option<PathBuf>,

    /// Print the transcript as JSON lines instead of colored text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RepoArg {
    Ssd,
    Uname,
}

impl From<RepoArg> for KnownRepo {
    fn from(arg: RepoArg) -> Self {
        match arg {
            RepoArg::Ssd => KnownRepo::Ssd,
            RepoArg::Uname => KnownRepo::Uname,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Shallow-clone one of the tracking repositories
    Clone {
        /// Which repository to clone
        #[arg(value_enum)]
        repo: RepoArg,

        /// Parent directory for the clone (prompted when omitted)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Replace an existing folder without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Record this machine's kernel signature and push it
    Record {
        /// Path of the uname clone (defaults to current directory)
        #[arg(short, long)]
        repo: Option<PathBuf>,

        /// Only append to the tracking file
        #[arg(long)]
        no_push: bool,

        /// Commit and push even when the signature was already recorded
        #[arg(long, conflicts_with = "no_push")]
        force_push: bool,

        /// Skip the SSH connectivity pre-check
        #[arg(long)]
        skip_ssh_check: bool,
    },

    /// Commit everything in a clone and push it
    Push {
        /// Path of the clone (defaults to current directory)
        #[arg(short, long)]
        repo: Option<PathBuf>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Remote to push to (defaults to the branch's upstream)
        #[arg(long)]
        remote: Option<String>,

        /// Skip the SSH connectivity pre-check
        #[arg(long)]
        skip_ssh_check: bool,
    },

    /// Check that SSH key authentication to the remote host works
    CheckSsh,

    /// Show or set the cached committer identity
    Identity {
        /// Committer email
        #[arg(long, requires = "name")]
        email: Option<String>,

        /// Committer name
        #[arg(long, requires = "email")]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let (sink, rx) = ChannelSink::channel();
    let log = Log::new(Arc::new(sink));
    let renderer = display::spawn(rx, cli.html_log.clone(), cli.json)?;

    let result = run(cli, &log).await;

    // Closing the last sender lets the renderer drain and stop.
    drop(log);
    renderer.await??;

    if let Err(e) = &result {
        display::print_hints(e);
    }
    result
}

async fn run(cli: Cli, log: &Log) -> Result<()> {
    let config = cli.config;

    match cli.command {
        Commands::Clone { repo, dir, yes } => {
            clone::run(repo.into(), dir, yes, config, log).await?;
        }
        Commands::Record {
            repo,
            no_push,
            force_push,
            skip_ssh_check,
        } => {
            record::run(repo, no_push, force_push, skip_ssh_check, config, log).await?;
        }
        Commands::Push {
            repo,
            message,
            remote,
            skip_ssh_check,
        } => {
            push::run(repo, message, remote, skip_ssh_check, config, log).await?;
        }
        Commands::CheckSsh => {
            check_ssh::run(config, log).await?;
        }
        Commands::Identity { email, name } => {
            identity::run(email, name, config)?;
        }
    }

    Ok(())
}
