//! Sequential, fail-fast execution of external commands.
//!
//! A [`Pipeline`] runs its steps one at a time in a fixed working directory.
//! Step `i + 1` is only spawned after step `i` exited normally with code 0.
//! Nothing is rolled back on failure: effects of earlier steps stay in place.

use crate::error::{Error, Result};
use crate::exec::{self, Completion, Step};
use crate::log::Log;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The program could not be located on PATH.
    ToolMissing,
    /// Spawning failed for another reason (permissions, bad workdir).
    Unstartable(String),
    Exit { code: i32, stderr: String },
    Abnormal { stderr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// 0-based index of the step currently running.
    RunningStep(usize),
    Succeeded,
    Failed { step: usize, cause: StepFailure },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub steps_run: usize,
}

pub struct Pipeline {
    workdir: PathBuf,
    steps: Vec<Step>,
    state: PipelineState,
    started: usize,
}

impl Pipeline {
    pub fn new(workdir: impl Into<PathBuf>, steps: Vec<Step>) -> Self {
        Self {
            workdir: workdir.into(),
            steps,
            state: PipelineState::Idle,
            started: 0,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Number of steps whose process was actually spawned.
    pub fn started(&self) -> usize {
        self.started
    }

    pub async fn run(&mut self, log: &Log) -> Result<PipelineReport> {
        let total = self.steps.len();

        for index in 0..total {
            let step = self.steps[index].clone();
            self.state = PipelineState::RunningStep(index);
            log.info(format!("[{}/{}] {}", index + 1, total, step));

            let completion = match exec::run_streaming(&self.workdir, &step, log).await {
                Ok(completion) => completion,
                Err(Error::ToolNotFound { program }) => {
                    warn!(%program, step = index + 1, "tool not found");
                    log.error(format!(
                        "'{}' not found. Make sure it is installed and on PATH.",
                        program
                    ));
                    self.state = PipelineState::Failed {
                        step: index,
                        cause: StepFailure::ToolMissing,
                    };
                    return Err(Error::ToolNotFound { program });
                }
                Err(e) => {
                    log.error(e.to_string());
                    self.state = PipelineState::Failed {
                        step: index,
                        cause: StepFailure::Unstartable(e.to_string()),
                    };
                    return Err(e);
                }
            };
            self.started += 1;

            let (code, stderr) = match completion {
                Completion::Success => continue,
                Completion::Exit { code, stderr } => {
                    self.state = PipelineState::Failed {
                        step: index,
                        cause: StepFailure::Exit {
                            code,
                            stderr: stderr.clone(),
                        },
                    };
                    (Some(code), stderr)
                }
                Completion::Abnormal { stderr } => {
                    self.state = PipelineState::Failed {
                        step: index,
                        cause: StepFailure::Abnormal {
                            stderr: stderr.clone(),
                        },
                    };
                    (None, stderr)
                }
            };

            let error = Error::StepFailed {
                step: index + 1,
                command: step.to_string(),
                code,
                stderr,
            };
            warn!(%error, "pipeline aborted");
            log.error(error.to_string());
            return Err(error);
        }

        self.state = PipelineState::Succeeded;
        debug!(steps = total, workdir = %self.workdir.display(), "pipeline succeeded");
        log.success("All steps completed successfully.");

        Ok(PipelineReport { steps_run: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sh(script: &str) -> Step {
        Step::new("sh", ["-c", script])
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        let mut pipeline = Pipeline::new(
            dir.path(),
            vec![sh("touch one"), sh("touch two"), sh("touch three")],
        );
        let report = pipeline.run(&log).await.unwrap();

        assert_eq!(report.steps_run, 3);
        assert_eq!(pipeline.state(), &PipelineState::Succeeded);
        assert!(dir.path().join("three").exists());
        assert!(sink.transcript().contains("All steps completed"));
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_steps() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        let mut pipeline = Pipeline::new(
            dir.path(),
            vec![
                sh("touch first"),
                sh("echo 'nothing to commit' >&2; exit 1"),
                sh("touch third"),
            ],
        );
        let err = pipeline.run(&log).await.unwrap_err();

        assert!(matches!(err, Error::StepFailed { step: 2, code: Some(1), .. }));
        assert_eq!(pipeline.started(), 2);
        assert_eq!(
            pipeline.state(),
            &PipelineState::Failed {
                step: 1,
                cause: StepFailure::Exit {
                    code: 1,
                    stderr: "nothing to commit\n".to_string()
                }
            }
        );
        // Earlier effects stay, later steps never ran.
        assert!(dir.path().join("first").exists());
        assert!(!dir.path().join("third").exists());
        assert!(!sink.transcript().contains("All steps completed"));
    }

    #[tokio::test]
    async fn test_failure_at_every_position_is_fail_fast() {
        for k in 0..3 {
            let dir = TempDir::new().unwrap();
            let log = Log::new(Arc::new(MemorySink::new()));

            let steps = (0..3)
                .map(|i| {
                    if i == k {
                        sh("exit 7")
                    } else {
                        sh(&format!("touch step{}", i))
                    }
                })
                .collect();
            let mut pipeline = Pipeline::new(dir.path(), steps);
            let err = pipeline.run(&log).await.unwrap_err();

            match err {
                Error::StepFailed { step, code, .. } => {
                    assert_eq!(step, k + 1);
                    assert_eq!(code, Some(7));
                }
                other => panic!("unexpected error: {other}"),
            }
            for later in (k + 1)..3 {
                assert!(!dir.path().join(format!("step{}", later)).exists());
            }
        }
    }

    #[tokio::test]
    async fn test_missing_tool_aborts_without_starting() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        let mut pipeline = Pipeline::new(
            dir.path(),
            vec![
                Step::new("kerntrack-no-such-tool", ["add"]),
                sh("touch after"),
            ],
        );
        let err = pipeline.run(&log).await.unwrap_err();

        assert!(matches!(err, Error::ToolNotFound { .. }));
        assert_eq!(pipeline.started(), 0);
        assert_eq!(
            pipeline.state(),
            &PipelineState::Failed {
                step: 0,
                cause: StepFailure::ToolMissing
            }
        );
        assert!(!dir.path().join("after").exists());
        assert!(sink.transcript().contains("not found"));
    }

    #[tokio::test]
    async fn test_missing_workdir_is_unstartable() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone");
        let sink = Arc::new(MemorySink::new());
        let log = Log::new(sink.clone());

        let mut pipeline = Pipeline::new(&gone, vec![sh("true"), sh("true")]);
        let err = pipeline.run(&log).await.unwrap_err();

        assert!(matches!(err, Error::WorkdirMissing { .. }));
        assert_eq!(pipeline.started(), 0);
        assert!(matches!(
            pipeline.state(),
            PipelineState::Failed {
                step: 0,
                cause: StepFailure::Unstartable(_)
            }
        ));
        let transcript = sink.transcript();
        assert!(transcript.contains("does not exist"));
        assert!(!transcript.contains("not found"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_succeeds() {
        let dir = TempDir::new().unwrap();
        let log = Log::new(Arc::new(MemorySink::new()));

        let mut pipeline = Pipeline::new(dir.path(), Vec::new());
        assert_eq!(pipeline.state(), &PipelineState::Idle);

        pipeline.run(&log).await.unwrap();
        assert_eq!(pipeline.state(), &PipelineState::Succeeded);
    }
}
