use std::sync::Arc;
use std::time::Duration as TickDuration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use logtail_api::{LogQuery, LogSource};
use logtail_types::{LogFilters, ResourceRef, SessionState};

use crate::config::EngineConfig;
use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::event::WatchEvent;
use crate::failure::{FailureMonitor, FailureVerdict};
use crate::fetcher::fetch_pages;
use crate::order;
use crate::window::WindowPlanner;

/// Which window policy a session runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchMode {
    /// Fixed window from the session start, re-queried until stopped
    Bounded,
    /// Window advancing with each successful fetch, starting at `start`
    Sliding { start: DateTime<Utc> },
}

/// Move `state` to `to`, but only out of `Running`
fn finish(state: &Mutex<SessionState>, to: SessionState) {
    let mut state = state.lock();
    if *state == SessionState::Running {
        *state = to;
    }
}

/// One tailing operation: a background task polling a log source
///
/// Exactly one task runs per started session. The dedup set and fetch cursor
/// are written only by that task; the accessors here read them under a lock.
pub struct WatchSession<S: LogSource> {
    source: Arc<S>,
    resource: ResourceRef,
    filters: LogFilters,
    mode: WatchMode,
    config: EngineConfig,

    /// Taken by the task on start
    events: Option<mpsc::UnboundedSender<WatchEvent>>,

    state: Arc<Mutex<SessionState>>,
    dedup: Arc<Deduplicator>,
    last_fetch: Arc<Mutex<Option<DateTime<Utc>>>>,
    started_at: Option<DateTime<Utc>>,

    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl<S: LogSource> WatchSession<S> {
    /// Watcher over `[start, start + bounded_span)`, polled every `bounded_tick`
    pub fn bounded(
        source: Arc<S>,
        resource: ResourceRef,
        filters: LogFilters,
        config: EngineConfig,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<Self, SessionError> {
        Self::new(source, resource, filters, WatchMode::Bounded, config, events)
    }

    /// Follower starting at `start`, polled every `sliding_tick`
    pub fn sliding(
        source: Arc<S>,
        resource: ResourceRef,
        filters: LogFilters,
        start: DateTime<Utc>,
        config: EngineConfig,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<Self, SessionError> {
        Self::new(
            source,
            resource,
            filters,
            WatchMode::Sliding { start },
            config,
            events,
        )
    }

    pub fn new(
        source: Arc<S>,
        resource: ResourceRef,
        filters: LogFilters,
        mode: WatchMode,
        config: EngineConfig,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<Self, SessionError> {
        if let Some(field) = resource.missing_field() {
            return Err(SessionError::InvalidInput(format!("{} is required", field)));
        }
        if let Some(reason) = config.invalid_setting() {
            return Err(SessionError::InvalidInput(reason.to_string()));
        }

        Ok(Self {
            source,
            resource,
            filters,
            mode,
            config,
            events: Some(events),
            state: Arc::new(Mutex::new(SessionState::Idle)),
            dedup: Arc::new(Deduplicator::new()),
            last_fetch: Arc::new(Mutex::new(None)),
            started_at: None,
            cancel: CancellationToken::new(),
            task: None,
        })
    }

    /// Spawn the polling task. Must be called inside a tokio runtime.
    ///
    /// Only an idle session can start; a stopped or failed one stays that way.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let events = {
            let mut state = self.state.lock();
            if *state != SessionState::Idle {
                return Err(SessionError::InvalidTransition { from: *state });
            }
            let Some(events) = self.events.take() else {
                return Err(SessionError::InvalidTransition { from: *state });
            };
            *state = SessionState::Running;
            events
        };

        let started_at = Utc::now();
        self.started_at = Some(started_at);

        let (planner, tick) = match self.mode {
            WatchMode::Bounded => (
                WindowPlanner::bounded(started_at, self.config.bounded_span),
                self.config.bounded_tick,
            ),
            WatchMode::Sliding { start } => (
                WindowPlanner::sliding(start, self.config.overlap, self.config.sliding_forward),
                self.config.sliding_tick,
            ),
        };

        let worker = Worker {
            source: Arc::clone(&self.source),
            resource: self.resource.clone(),
            filters: self.filters.clone(),
            config: self.config.clone(),
            planner,
            monitor: FailureMonitor::new(self.config.max_failures),
            dedup: Arc::clone(&self.dedup),
            last_fetch: Arc::clone(&self.last_fetch),
            state: Arc::clone(&self.state),
            events,
        };

        tracing::info!(resource = %self.resource, mode = ?self.mode, "starting log session");
        self.task = Some(tokio::spawn(worker.run(tick, self.cancel.clone())));
        Ok(())
    }

    /// Request the task to exit after its current tick. Idempotent, never blocks.
    pub fn stop(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock();
        if matches!(*state, SessionState::Idle | SessionState::Running) {
            *state = SessionState::Stopped;
            tracing::info!(resource = %self.resource, "log session stopped");
        }
    }

    /// Wait for the background task to exit
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Stop and wait for the task
    pub async fn shutdown(&mut self) {
        self.stop();
        self.wait().await;
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Time of the last successful fetch
    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        *self.last_fetch.lock()
    }

    /// Distinct lines delivered so far
    pub fn delivered_count(&self) -> usize {
        self.dedup.len()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }
}

impl<S: LogSource> Drop for WatchSession<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum TickOutcome {
    Continue,
    Finish(SessionState),
}

/// State owned by the background task
struct Worker<S: LogSource> {
    source: Arc<S>,
    resource: ResourceRef,
    filters: LogFilters,
    config: EngineConfig,
    planner: WindowPlanner,
    monitor: FailureMonitor,
    dedup: Arc<Deduplicator>,
    last_fetch: Arc<Mutex<Option<DateTime<Utc>>>>,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl<S: LogSource> Worker<S> {
    async fn run(mut self, tick: TickDuration, cancel: CancellationToken) {
        // First tick completes immediately
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    finish(&self.state, SessionState::Stopped);
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                TickOutcome::Continue => {}
                TickOutcome::Finish(state) => {
                    finish(&self.state, state);
                    break;
                }
            }
        }

        tracing::debug!(resource = %self.resource, "log session task exited");
    }

    async fn tick(&mut self) -> TickOutcome {
        let now = Utc::now();
        let window = self.planner.next_window(now);
        let query = LogQuery::new(self.resource.clone(), window)
            .with_filters(self.filters.clone())
            .with_log_type(self.config.log_type)
            .with_limit(self.config.page_size)
            .with_interval(self.config.interval_secs);

        let result = match fetch_pages(self.source.as_ref(), query, self.config.max_pages).await {
            Err(e) if e.is_resource_not_found() && self.config.missing_resource_is_empty => {
                tracing::debug!(resource = %self.resource, "resource absent from response");
                Ok(Vec::new())
            }
            other => other,
        };

        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    resource = %self.resource,
                    failures = self.monitor.consecutive_failures() + 1,
                    error = %e,
                    "log fetch failed"
                );
                return match self.monitor.record_failure() {
                    FailureVerdict::Warn => {
                        self.send(WatchEvent::Warning(format!("Error fetching logs: {}", e)))
                    }
                    FailureVerdict::Retry => TickOutcome::Continue,
                    FailureVerdict::Abort => {
                        tracing::error!(resource = %self.resource, error = %e, "giving up on logs");
                        finish(&self.state, SessionState::Failed);
                        let _ = self.events.send(WatchEvent::Fatal(format!(
                            "Failed to fetch logs after {} attempts: {}",
                            self.monitor.max_failures(),
                            e
                        )));
                        TickOutcome::Finish(SessionState::Failed)
                    }
                };
            }
        };

        self.monitor.record_success();
        self.planner.record_success(now);
        *self.last_fetch.lock() = Some(now);

        let received = entries.len();
        let fresh = self.dedup.retain_new(order::chronological(entries));
        tracing::debug!(
            resource = %self.resource,
            received,
            delivered = fresh.len(),
            "log tick"
        );

        for entry in fresh {
            if let TickOutcome::Finish(state) = self.send(WatchEvent::Log(entry)) {
                return TickOutcome::Finish(state);
            }
        }
        TickOutcome::Continue
    }

    /// Deliver an event; a dropped receiver ends the session
    fn send(&self, event: WatchEvent) -> TickOutcome {
        if self.events.send(event).is_err() {
            tracing::debug!(resource = %self.resource, "event receiver dropped");
            return TickOutcome::Finish(SessionState::Stopped);
        }
        TickOutcome::Continue
    }
}
