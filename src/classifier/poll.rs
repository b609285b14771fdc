//! Run state machine and the poll loop that drives it.
//!
//! `Queued -> InProgress -> {Completed | Failed} | TimedOut`
//!
//! The loop sleeps on a `Clock` between status checks, so tests can run
//! the whole machine on virtual time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AssistantService, ConversationRun, RemoteRunStatus, RunSnapshot};
use crate::config::PollConfig;
use crate::error::ClassifierError;

/// Time source for the poll loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// State of a classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Accepted by the service, not started.
    Queued,
    /// Being worked on.
    InProgress,
    /// Finished; a label can be read.
    Completed,
    /// Finished without a usable result.
    Failed,
    /// Deadline passed before a terminal state was observed.
    TimedOut,
}

impl RunState {
    /// Collapse the service's status vocabulary onto the machine's states.
    pub fn from_remote(status: RemoteRunStatus) -> Self {
        match status {
            RemoteRunStatus::Queued => Self::Queued,
            RemoteRunStatus::InProgress
            | RemoteRunStatus::Cancelling
            | RemoteRunStatus::Unknown => Self::InProgress,
            RemoteRunStatus::Completed => Self::Completed,
            RemoteRunStatus::Failed
            | RemoteRunStatus::Cancelled
            | RemoteRunStatus::Expired
            | RemoteRunStatus::Incomplete
            | RemoteRunStatus::RequiresAction => Self::Failed,
        }
    }

    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: RunState) -> bool {
        use RunState::*;

        matches!(
            (self, target),
            (Queued, Queued)
                | (Queued, InProgress)
                | (Queued, Completed)
                | (Queued, Failed)
                | (Queued, TimedOut)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, TimedOut)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        write!(f, "{s}")
    }
}

/// Waits for a run to reach a terminal state.
#[derive(Clone)]
pub struct RunPoller {
    config: PollConfig,
    clock: Arc<dyn Clock>,
}

impl RunPoller {
    pub fn new(config: PollConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Poller on real time.
    pub fn with_tokio_clock(config: PollConfig) -> Self {
        Self::new(config, Arc::new(TokioClock))
    }

    /// Poll `service` until the run is terminal or the deadline passes.
    ///
    /// The deadline counts from the moment this is called. Sleeps are cut
    /// short so the loop never waits past it.
    pub async fn wait(
        &self,
        service: &dyn AssistantService,
        created: RunSnapshot,
    ) -> Result<ConversationRun, ClassifierError> {
        let started = self.clock.now();
        let RunSnapshot {
            id: run_id,
            thread_id,
            status,
        } = created;
        let mut state = RunState::from_remote(status);
        let mut polls = 0u32;

        while !state.is_terminal() {
            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= self.config.deadline {
                warn!(
                    run_id = %run_id,
                    polls,
                    deadline_ms = self.config.deadline.as_millis() as u64,
                    "Classification run timed out"
                );
                state = RunState::TimedOut;
                break;
            }

            let remaining = self.config.deadline - elapsed;
            self.clock.sleep(self.config.interval.min(remaining)).await;

            let snapshot = service.retrieve_run(&thread_id, &run_id).await?;
            polls += 1;
            let next = RunState::from_remote(snapshot.status);
            if !state.can_transition_to(next) {
                warn!(run_id = %run_id, from = %state, to = %next, "Unexpected run transition");
            } else if next != state {
                debug!(run_id = %run_id, from = %state, to = %next, "Run state changed");
            }
            state = next;
        }

        Ok(ConversationRun {
            run_id,
            conversation_id: thread_id,
            status: state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ManualClock, ScriptedAssistant};
    use super::*;

    fn snapshot(status: RemoteRunStatus) -> RunSnapshot {
        RunSnapshot {
            id: "run_1".into(),
            thread_id: "thread_1".into(),
            status,
        }
    }

    fn poller(interval_ms: u64, deadline_ms: u64, clock: Arc<ManualClock>) -> RunPoller {
        RunPoller::new(
            PollConfig {
                interval: Duration::from_millis(interval_ms),
                deadline: Duration::from_millis(deadline_ms),
            },
            clock,
        )
    }

    #[test]
    fn remote_status_mapping() {
        use RemoteRunStatus as R;
        assert_eq!(RunState::from_remote(R::Queued), RunState::Queued);
        assert_eq!(RunState::from_remote(R::InProgress), RunState::InProgress);
        assert_eq!(RunState::from_remote(R::Cancelling), RunState::InProgress);
        assert_eq!(RunState::from_remote(R::Completed), RunState::Completed);
        for failed in [R::Failed, R::Cancelled, R::Expired, R::Incomplete, R::RequiresAction] {
            assert_eq!(RunState::from_remote(failed), RunState::Failed);
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use RunState::*;
        for terminal in [Completed, Failed, TimedOut] {
            assert!(terminal.is_terminal());
            for target in [Queued, InProgress, Completed, Failed, TimedOut] {
                assert!(!terminal.can_transition_to(target));
            }
        }
        assert!(!Queued.is_terminal());
        assert!(!InProgress.is_terminal());
        assert!(!InProgress.can_transition_to(Queued));
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(RunState::TimedOut.to_string(), "timed_out");
        assert_eq!(RunState::InProgress.to_string(), "in_progress");
    }

    #[tokio::test]
    async fn polls_until_completed() {
        let clock = Arc::new(ManualClock::new());
        let service = ScriptedAssistant::new(
            RemoteRunStatus::Queued,
            &[
                RemoteRunStatus::Queued,
                RemoteRunStatus::InProgress,
                RemoteRunStatus::Completed,
            ],
        );

        let run = poller(500, 60_000, Arc::clone(&clock))
            .wait(&service, snapshot(RemoteRunStatus::Queued))
            .await
            .unwrap();

        assert_eq!(run.status, RunState::Completed);
        assert_eq!(run.run_id, "run_1");
        assert_eq!(run.conversation_id, "thread_1");
        assert_eq!(service.retrieves(), 3);
        assert_eq!(clock.total_slept(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn terminal_on_creation_skips_polling() {
        let clock = Arc::new(ManualClock::new());
        let service = ScriptedAssistant::new(RemoteRunStatus::Completed, &[]);

        let run = poller(500, 60_000, Arc::clone(&clock))
            .wait(&service, snapshot(RemoteRunStatus::Completed))
            .await
            .unwrap();

        assert_eq!(run.status, RunState::Completed);
        assert_eq!(service.retrieves(), 0);
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[tokio::test]
    async fn failure_stops_polling() {
        let clock = Arc::new(ManualClock::new());
        let service = ScriptedAssistant::new(
            RemoteRunStatus::Queued,
            &[RemoteRunStatus::InProgress, RemoteRunStatus::Expired],
        );

        let run = poller(500, 60_000, clock)
            .wait(&service, snapshot(RemoteRunStatus::Queued))
            .await
            .unwrap();

        assert_eq!(run.status, RunState::Failed);
        assert_eq!(service.retrieves(), 2);
    }

    #[tokio::test]
    async fn deadline_forces_timed_out() {
        let clock = Arc::new(ManualClock::new());
        let service = ScriptedAssistant::new(RemoteRunStatus::Queued, &[RemoteRunStatus::InProgress]);

        let run = poller(500, 2_000, Arc::clone(&clock))
            .wait(&service, snapshot(RemoteRunStatus::Queued))
            .await
            .unwrap();

        assert_eq!(run.status, RunState::TimedOut);
        assert_eq!(service.retrieves(), 4);
        assert_eq!(clock.total_slept(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn last_sleep_is_clamped_to_deadline() {
        let clock = Arc::new(ManualClock::new());
        let service = ScriptedAssistant::new(RemoteRunStatus::Queued, &[RemoteRunStatus::Queued]);

        let run = poller(700, 2_000, Arc::clone(&clock))
            .wait(&service, snapshot(RemoteRunStatus::Queued))
            .await
            .unwrap();

        assert_eq!(run.status, RunState::TimedOut);
        let sleeps = clock.sleeps.lock().unwrap().clone();
        assert_eq!(
            sleeps,
            vec![
                Duration::from_millis(700),
                Duration::from_millis(700),
                Duration::from_millis(600),
            ]
        );
    }

    #[tokio::test]
    async fn zero_deadline_times_out_immediately() {
        let clock = Arc::new(ManualClock::new());
        let service = ScriptedAssistant::new(RemoteRunStatus::Queued, &[RemoteRunStatus::Completed]);

        let run = poller(500, 0, Arc::clone(&clock))
            .wait(&service, snapshot(RemoteRunStatus::Queued))
            .await
            .unwrap();

        assert_eq!(run.status, RunState::TimedOut);
        assert_eq!(service.retrieves(), 0);
    }

    #[tokio::test]
    async fn tokio_clock_sleeps_on_virtual_time() {
        tokio::time::pause();
        let clock = TokioClock;
        let before = tokio::time::Instant::now();
        clock.sleep(Duration::from_secs(30)).await;
        assert!(tokio::time::Instant::now() - before >= Duration::from_secs(30));
    }
}
