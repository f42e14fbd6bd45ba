//! # kerntrack-core
//!
//! Core library for kerntrack - drives `git`, `ssh` and `uname` to clone the
//! tracking repositories, record the local kernel signature and push it back.
//!
//! Every operation reports progress as a stream of [`LogEvent`]s through a
//! [`Log`] handle and returns a final [`Result`], so it can run without any
//! user interface attached.

pub mod clone;
pub mod config;
pub mod error;
pub mod exec;
pub mod kernel;
pub mod log;
pub mod pipeline;
pub mod probe;
pub mod publish;
pub mod repos;
pub mod trigger;

pub use clone::{CloneOrchestrator, CloneOutcome, Confirm, FixedAnswer};
pub use config::{Identity, IdentityPrompt, Settings, SettingsStore};
pub use error::{Error, Result};
pub use exec::Step;
pub use kernel::{AppendOutcome, TrackingFile};
pub use log::{ChannelSink, Log, LogEvent, LogLevel, LogSink, MemorySink};
pub use pipeline::{Pipeline, PipelineReport, PipelineState, StepFailure};
pub use probe::SshProbe;
pub use publish::{Publisher, PushPolicy, RecordOutcome};
pub use repos::{KnownRepo, RepoSpec};
pub use trigger::{Trigger, TriggerGuard};
