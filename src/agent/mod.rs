pub mod executor;
pub mod generator;
pub mod selector;

use std::sync::Arc;

use flume::Sender;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::CycleConfig;
use crate::forum::{Forum, Item};
use crate::memory::{load_blocking, SeenStore};

use executor::{ActionExecutor, ExecutionError};
use generator::{GenerationOutcome, NoReplyReason, ReplyGenerator};
use selector::select_candidate;

/// Characters of a reply kept in log lines and events.
const REPLY_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleState {
    Idle,
    Loading,
    Selecting,
    Generating,
    Executing,
    Failed,
}

#[derive(Debug, Clone)]
pub enum AgentEvent {
    StateChanged(CycleState),
    Observation(String),
    CandidateSelected {
        item_id: String,
        title: String,
    },
    ActionTaken {
        item_id: String,
        title: String,
        reply: String,
    },
    /// Reply went out but the seen-set write failed.
    CommitAnomaly {
        item_id: String,
        error: String,
    },
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSeverity {
    /// Nothing to do this cycle.
    Idle,
    Success,
    /// Degraded at one step; the candidate stays eligible.
    SoftFailure,
    /// Infrastructure problem for this cycle.
    HardFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was still running.
    Skipped,
    NoCandidate,
    NoReply {
        item_id: String,
        reason: NoReplyReason,
    },
    EmptyReply {
        item_id: String,
    },
    Posted {
        item_id: String,
        reply: String,
    },
    PostFailed {
        item_id: String,
        error: String,
    },
    CommitFailed {
        item_id: String,
        error: String,
    },
    Failed {
        stage: CycleState,
        error: String,
    },
}

impl CycleOutcome {
    pub fn severity(&self) -> OutcomeSeverity {
        match self {
            CycleOutcome::Skipped | CycleOutcome::NoCandidate => OutcomeSeverity::Idle,
            CycleOutcome::Posted { .. } => OutcomeSeverity::Success,
            CycleOutcome::NoReply { .. }
            | CycleOutcome::EmptyReply { .. }
            | CycleOutcome::PostFailed { .. } => OutcomeSeverity::SoftFailure,
            CycleOutcome::CommitFailed { .. } | CycleOutcome::Failed { .. } => {
                OutcomeSeverity::HardFailure
            }
        }
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleOutcome::Skipped => write!(f, "skipped (previous cycle still running)"),
            CycleOutcome::NoCandidate => write!(f, "no new threads"),
            CycleOutcome::NoReply { item_id, reason } => match reason {
                NoReplyReason::ServiceError(error) => {
                    write!(f, "no reply for {} (generation failed: {})", item_id, error)
                }
                NoReplyReason::NoGenerations => {
                    write!(f, "no reply for {} (no generations)", item_id)
                }
            },
            CycleOutcome::EmptyReply { item_id } => {
                write!(f, "generated reply for {} was empty, not posted", item_id)
            }
            CycleOutcome::Posted { item_id, reply } => {
                write!(f, "commented on {}: {}", item_id, preview(reply))
            }
            CycleOutcome::PostFailed { item_id, error } => {
                write!(f, "posting to {} failed: {}", item_id, error)
            }
            CycleOutcome::CommitFailed { item_id, error } => {
                write!(f, "posted to {} but not recorded: {}", item_id, error)
            }
            CycleOutcome::Failed { stage, error } => {
                write!(f, "cycle failed while {:?}: {}", stage, error)
            }
        }
    }
}

/// Runs select → generate → post → record, one candidate per cycle.
pub struct Agent {
    config: CycleConfig,
    forum: Arc<dyn Forum>,
    store: Arc<dyn SeenStore>,
    generator: ReplyGenerator,
    executor: ActionExecutor,
    event_tx: Sender<AgentEvent>,
    cycle_lock: Mutex<()>,
}

impl Agent {
    pub fn new(
        config: CycleConfig,
        forum: Arc<dyn Forum>,
        store: Arc<dyn SeenStore>,
        generator: ReplyGenerator,
        event_tx: Sender<AgentEvent>,
    ) -> Self {
        let executor = ActionExecutor::new(forum.clone(), store.clone());
        Self {
            config,
            forum,
            store,
            generator,
            executor,
            event_tx,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    fn emit(&self, event: AgentEvent) {
        let _ = self.event_tx.send(event);
    }

    fn set_state(&self, state: CycleState) {
        tracing::debug!("Cycle state -> {:?}", state);
        self.emit(AgentEvent::StateChanged(state));
    }

    fn fail(&self, stage: CycleState, error: anyhow::Error) -> CycleOutcome {
        let error = format!("{:#}", error);
        tracing::error!("Cycle aborted while {:?}: {}", stage, error);
        self.emit(AgentEvent::Error(error.clone()));
        self.set_state(CycleState::Failed);
        CycleOutcome::Failed { stage, error }
    }

    fn finish(&self, outcome: CycleOutcome) -> CycleOutcome {
        self.set_state(CycleState::Idle);
        outcome
    }

    /// Run one cycle. Overlapping calls return `Skipped` without side effects.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            tracing::warn!("Previous cycle still running, skipping this invocation");
            return CycleOutcome::Skipped;
        };

        self.set_state(CycleState::Loading);
        let seen = match load_blocking(self.store.clone()).await {
            Ok(seen) => seen,
            Err(e) => return self.fail(CycleState::Loading, e),
        };

        self.set_state(CycleState::Selecting);
        let window = match self
            .forum
            .fetch_new(&self.config.subreddit, self.config.feed_limit)
            .await
        {
            Ok(window) => window,
            Err(e) => return self.fail(CycleState::Selecting, e),
        };

        let Some(candidate) = select_candidate(&seen, &window).cloned() else {
            tracing::info!(
                "No unseen threads in the newest {} of r/{} ({} already handled)",
                window.len(),
                self.config.subreddit,
                seen.len()
            );
            self.emit(AgentEvent::Observation("No new threads.".to_string()));
            return self.finish(CycleOutcome::NoCandidate);
        };

        tracing::info!(
            "Selected {} ('{}') on {}",
            candidate.id,
            candidate.title,
            self.forum.name()
        );
        self.emit(AgentEvent::CandidateSelected {
            item_id: candidate.id.clone(),
            title: candidate.title.clone(),
        });

        self.set_state(CycleState::Generating);
        let reply = match self.generator.generate(&candidate.title).await {
            GenerationOutcome::Reply(reply) => reply,
            GenerationOutcome::NoReply(reason) => {
                self.emit(AgentEvent::Observation(format!(
                    "No reply generated for {}; will retry next cycle",
                    candidate.id
                )));
                return self.finish(CycleOutcome::NoReply {
                    item_id: candidate.id,
                    reason,
                });
            }
        };

        if reply.is_empty() {
            tracing::warn!("Generated reply for {} is empty, not posting", candidate.id);
            self.emit(AgentEvent::Observation(format!(
                "Empty reply for {}; will retry next cycle",
                candidate.id
            )));
            return self.finish(CycleOutcome::EmptyReply {
                item_id: candidate.id,
            });
        }

        self.set_state(CycleState::Executing);
        let outcome = self.execute(&candidate, reply).await;
        self.finish(outcome)
    }

    async fn execute(&self, candidate: &Item, reply: String) -> CycleOutcome {
        let err = match self.executor.execute(candidate, &reply).await {
            Ok(()) => {
                tracing::info!("Commented on {}: {}", candidate.id, preview(&reply));
                self.emit(AgentEvent::ActionTaken {
                    item_id: candidate.id.clone(),
                    title: candidate.title.clone(),
                    reply: reply.clone(),
                });
                return CycleOutcome::Posted {
                    item_id: candidate.id.clone(),
                    reply,
                };
            }
            Err(err) => err,
        };

        let item_id = err.item_id().to_string();
        let error = err.to_string();
        match err {
            ExecutionError::Post { .. } => {
                tracing::warn!("{}", error);
                self.emit(AgentEvent::Error(error.clone()));
                CycleOutcome::PostFailed { item_id, error }
            }
            ExecutionError::Commit { .. } => {
                tracing::error!("{} (the thread may be replied to again)", error);
                self.emit(AgentEvent::CommitAnomaly {
                    item_id: item_id.clone(),
                    error: error.clone(),
                });
                CycleOutcome::CommitFailed { item_id, error }
            }
        }
    }

    /// Run a cycle now, then one per poll interval, forever.
    ///
    /// Cycles are awaited back to back, so two never overlap.
    pub async fn run_loop(self: Arc<Self>) {
        tracing::info!(
            "Agent loop starting (r/{}, every {}s, window {})",
            self.config.subreddit,
            self.config.poll_interval.as_secs(),
            self.config.feed_limit
        );
        self.emit(AgentEvent::Observation("=== Bot Started ===".to_string()));

        loop {
            let outcome = self.run_cycle().await;
            match outcome.severity() {
                OutcomeSeverity::HardFailure => tracing::error!("Cycle finished: {}", outcome),
                OutcomeSeverity::SoftFailure => tracing::warn!("Cycle finished: {}", outcome),
                _ => tracing::info!("Cycle finished: {}", outcome),
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

/// First `REPLY_PREVIEW_CHARS` characters, with an ellipsis when cut.
pub fn preview(reply: &str) -> String {
    let mut chars = reply.chars();
    let head: String = chars.by_ref().take(REPLY_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
