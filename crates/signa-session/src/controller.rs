//! Practice session orchestration.
//!
//! `SessionController` owns the detection loop and fans each classification
//! event out to the `StreamAggregator` and the `PracticeController`, in tick
//! order, under one lock. Observers follow along through a broadcast channel
//! of `SessionUpdate`s.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use signa_models::{
    ClassificationEvent, HistoryEntry, Label, LabelCatalog, PracticeMode, PracticeState,
    ProgressReport, SessionId, SessionSummary, SessionUpdate,
};
use signa_store::SummaryStore;
use signa_vision::{Classifier, DetectionLoop, DetectionSink, FrameSource, LoopStats};

use crate::aggregator::StreamAggregator;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::logging::SessionLogger;
use crate::metrics;
use crate::practice::{PracticeController, PracticeOutcome};
use crate::summarizer::SessionSummarizer;

/// State shared between the controller, the loop sink and timer tasks.
struct SessionCore {
    aggregator: StreamAggregator,
    practice: PracticeController,
    /// Recorded once the camera is producing; scoped to the running session.
    started_at: Option<DateTime<Utc>>,
    /// False outside a session; the sink drops anything that arrives then.
    active: bool,
    settle_task: Option<JoinHandle<()>>,
}

type SharedCore = Arc<StdMutex<SessionCore>>;

fn lock_core(core: &StdMutex<SessionCore>) -> MutexGuard<'_, SessionCore> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn publish(updates: &broadcast::Sender<SessionUpdate>, update: SessionUpdate) {
    // No subscribers is fine.
    let _ = updates.send(update);
}

/// Receives loop results on the tick task.
struct SessionSink {
    core: SharedCore,
    updates: broadcast::Sender<SessionUpdate>,
    settle_delay: Duration,
}

impl DetectionSink for SessionSink {
    fn on_event(&self, event: &ClassificationEvent) {
        let mut core = lock_core(&self.core);
        if !core.active {
            return;
        }

        core.aggregator.observe(event);
        metrics::record_event_observed();
        publish(
            &self.updates,
            SessionUpdate::Detected {
                label: event.label.clone(),
                confidence: event.confidence,
            },
        );

        let required = core.practice.required_correct();
        match core.practice.on_event(event) {
            PracticeOutcome::Progress { consecutive } => {
                publish(&self.updates, SessionUpdate::Progress { consecutive, required });
            }
            PracticeOutcome::Reset { previous } if previous > 0 => {
                publish(&self.updates, SessionUpdate::Progress { consecutive: 0, required });
            }
            PracticeOutcome::TargetCompleted { label } => {
                metrics::record_target_completed();
                info!(label = %label, "Target completed");
                publish(
                    &self.updates,
                    SessionUpdate::Progress {
                        consecutive: required,
                        required,
                    },
                );
                publish(&self.updates, SessionUpdate::TargetCompleted { label });

                if let Some(ticket) = core.practice.settle_ticket() {
                    let task = schedule_advance(
                        Arc::clone(&self.core),
                        self.updates.clone(),
                        self.settle_delay,
                        ticket,
                    );
                    if let Some(previous) = core.settle_task.replace(task) {
                        previous.abort();
                    }
                }
            }
            _ => {}
        }
    }

    fn on_idle(&self) {
        let core = lock_core(&self.core);
        if core.active {
            publish(&self.updates, SessionUpdate::Idle);
        }
    }
}

/// Pick the next target once the settle delay has passed.
fn schedule_advance(
    core: SharedCore,
    updates: broadcast::Sender<SessionUpdate>,
    delay: Duration,
    ticket: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let mut core = lock_core(&core);
        if !core.active {
            return;
        }
        match core.practice.advance(ticket) {
            Some(label) => {
                debug!(label = %label, "Settle finished, new target");
                publish(&updates, SessionUpdate::TargetChanged { label: Some(label) });
            }
            None => debug!(ticket, "Settle was cancelled"),
        }
    })
}

/// Replace the target every `period` while in Validation mode.
fn spawn_rotation(
    core: SharedCore,
    updates: broadcast::Sender<SessionUpdate>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut core = lock_core(&core);
            if !core.active {
                break;
            }
            if !core.practice.mode().is_scored() || core.practice.is_settling() {
                continue;
            }
            if let Some(label) = core.practice.change_target() {
                debug!(label = %label, "Auto-rotated target");
                publish(&updates, SessionUpdate::TargetChanged { label: Some(label) });
            }
        }
    })
}

struct ActiveSession {
    session_id: SessionId,
    user_id: String,
    logger: SessionLogger,
}

/// Runs practice sessions: camera, classifier, scoring, summary, persistence.
pub struct SessionController {
    config: SessionConfig,
    catalog: Arc<LabelCatalog>,
    detection: DetectionLoop,
    core: SharedCore,
    store: Arc<dyn SummaryStore>,
    summarizer: SessionSummarizer,
    updates: broadcast::Sender<SessionUpdate>,
    session: Option<ActiveSession>,
    auto_rotate: bool,
    rotate_task: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        catalog: LabelCatalog,
        source: Box<dyn FrameSource>,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn SummaryStore>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let practice = PracticeController::new(
            Arc::clone(&catalog),
            config.required_correct,
            config.confidence_threshold,
        );
        let core = Arc::new(StdMutex::new(SessionCore {
            aggregator: StreamAggregator::new(),
            practice,
            started_at: None,
            active: false,
            settle_task: None,
        }));
        let (updates, _) = broadcast::channel(config.update_buffer.max(1));

        Self {
            detection: DetectionLoop::new(config.detection.clone(), source, classifier),
            summarizer: SessionSummarizer::new(config.top_signs),
            config,
            catalog,
            core,
            store,
            updates,
            session: None,
            auto_rotate: false,
            rotate_task: None,
        }
    }

    /// Use a seeded generator for target selection.
    pub fn with_seed(self, seed: u64) -> Self {
        lock_core(&self.core).practice.reseed(seed);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|s| &s.session_id)
    }

    /// Subscribe to session updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub fn practice_state(&self) -> PracticeState {
        lock_core(&self.core).practice.snapshot()
    }

    /// Copy of the running session's history.
    pub fn history(&self) -> Vec<HistoryEntry> {
        lock_core(&self.core).aggregator.snapshot()
    }

    pub fn loop_stats(&self) -> LoopStats {
        self.detection.stats()
    }

    /// Start a session for `user_id`.
    ///
    /// Refuses with a not-ready error when the label catalog is empty or the
    /// classifier has not loaded, and with a camera error when the device
    /// cannot be acquired. The controller stays idle in every error case.
    pub async fn start(&mut self, user_id: impl Into<String>) -> SessionResult<SessionId> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        self.config.validate()?;
        if self.catalog.is_empty() {
            return Err(SessionError::not_ready("label catalog is empty"));
        }
        let user_id = user_id.into();

        {
            let mut core = lock_core(&self.core);
            core.active = false;
            core.started_at = None;
            core.aggregator.reset();
            core.practice.reset();
            if let Some(task) = core.settle_task.take() {
                task.abort();
            }
        }

        let sink = Arc::new(SessionSink {
            core: Arc::clone(&self.core),
            updates: self.updates.clone(),
            settle_delay: self.config.settle_delay,
        });
        if let Err(e) = self.detection.start(sink).await {
            warn!(user_id = %user_id, error = %e, "Session failed to start");
            return Err(e.into());
        }

        let session_id = SessionId::new();
        let logger = SessionLogger::new(&session_id, "practice");
        let target = {
            let mut core = lock_core(&self.core);
            core.started_at = Some(Utc::now());
            core.active = true;
            let target = core.practice.change_target();
            // Published under the lock so no tick update can precede them.
            publish(
                &self.updates,
                SessionUpdate::Started {
                    session_id: session_id.clone(),
                },
            );
            publish(
                &self.updates,
                SessionUpdate::TargetChanged {
                    label: target.clone(),
                },
            );
            target
        };

        if self.auto_rotate {
            self.rotate_task = Some(spawn_rotation(
                Arc::clone(&self.core),
                self.updates.clone(),
                self.config.auto_rotate,
            ));
        }

        logger.log_start(&format!(
            "user {}, first target {}",
            user_id,
            target.as_ref().map(Label::as_str).unwrap_or("-")
        ));
        self.session = Some(ActiveSession {
            session_id: session_id.clone(),
            user_id,
            logger,
        });
        Ok(session_id)
    }

    /// Stop the session, release the camera and summarize.
    ///
    /// Safe to call repeatedly. Returns the persisted summary, or `None` when
    /// no session was running or nothing was detected. Persistence failures
    /// are logged and do not fail the stop.
    pub async fn stop(&mut self) -> Option<SessionSummary> {
        if let Some(task) = self.rotate_task.take() {
            task.abort();
        }
        let stats = self.detection.stop().await;

        let session = self.session.take()?;
        let (history, started_at) = {
            let mut core = lock_core(&self.core);
            core.active = false;
            if let Some(task) = core.settle_task.take() {
                task.abort();
            }
            let history = core.aggregator.snapshot();
            core.aggregator.reset();
            core.practice.reset();
            (history, core.started_at.take())
        };
        publish(
            &self.updates,
            SessionUpdate::Stopped {
                session_id: session.session_id.clone(),
            },
        );

        let summary = self
            .summarizer
            .summarize(&history, started_at, Utc::now())
            .map(|mut summary| {
                summary.session_id = session.session_id.clone();
                summary.user_id = Some(session.user_id.clone());
                summary
            });
        metrics::record_session_ended(summary.as_ref());

        session.logger.log_progress(&format!(
            "{} ticks, {} events, {} idle, {} failed, {} timed out",
            stats.ticks, stats.emitted, stats.idle, stats.failed, stats.timed_out
        ));

        match &summary {
            Some(summary) => {
                match self.store.save(&session.user_id, summary).await {
                    Ok(()) => session.logger.log_completion(&format!(
                        "{} signs in {:.2}s, saved to {}",
                        summary.total_signs(),
                        summary.seconds_elapsed,
                        self.store.backend()
                    )),
                    Err(e) if e.is_retryable() => session
                        .logger
                        .log_warning(&format!("Summary not saved, store unavailable: {}", e)),
                    Err(e) => session
                        .logger
                        .log_error(&format!("Failed to save summary: {}", e)),
                }
            }
            None => session.logger.log_completion("nothing to summarize"),
        }

        summary
    }

    /// Switch between Validation and Manual mode.
    pub fn toggle_mode(&self) -> PracticeMode {
        let mut core = lock_core(&self.core);
        let mode = core.practice.toggle_mode();
        publish(&self.updates, SessionUpdate::ModeChanged { mode });
        info!(mode = %mode, "Practice mode changed");
        mode
    }

    /// Set the target explicitly. The label must be in the catalog.
    pub fn set_target(&self, label: impl Into<Label>) -> SessionResult<()> {
        let label = label.into();
        if !self.catalog.contains(&label) {
            return Err(SessionError::UnknownLabel(label.to_string()));
        }
        let mut core = lock_core(&self.core);
        core.practice.set_target(label.clone());
        publish(&self.updates, SessionUpdate::TargetChanged { label: Some(label) });
        Ok(())
    }

    /// Replace the target with a random catalog label.
    pub fn change_target(&self) -> Option<Label> {
        let mut core = lock_core(&self.core);
        let label = core.practice.change_target()?;
        publish(
            &self.updates,
            SessionUpdate::TargetChanged {
                label: Some(label.clone()),
            },
        );
        Some(label)
    }

    /// Manual mode: show the next catalog label.
    pub fn browse_next(&self) -> Option<Label> {
        let mut core = lock_core(&self.core);
        let label = core.practice.browse_next()?;
        publish(
            &self.updates,
            SessionUpdate::TargetChanged {
                label: Some(label.clone()),
            },
        );
        Some(label)
    }

    /// Manual mode: show the previous catalog label.
    pub fn browse_previous(&self) -> Option<Label> {
        let mut core = lock_core(&self.core);
        let label = core.practice.browse_previous()?;
        publish(
            &self.updates,
            SessionUpdate::TargetChanged {
                label: Some(label.clone()),
            },
        );
        Some(label)
    }

    /// Turn periodic target rotation on or off.
    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.auto_rotate = enabled;
        match (enabled, self.rotate_task.is_some()) {
            (true, false) if self.session.is_some() => {
                self.rotate_task = Some(spawn_rotation(
                    Arc::clone(&self.core),
                    self.updates.clone(),
                    self.config.auto_rotate,
                ));
            }
            (false, true) => {
                if let Some(task) = self.rotate_task.take() {
                    task.abort();
                }
            }
            _ => {}
        }
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    /// Progress across every stored session of `user_id`.
    pub async fn progress(&self, user_id: &str) -> SessionResult<ProgressReport> {
        Ok(self.store.progress(user_id).await?)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(task) = self.rotate_task.take() {
            task.abort();
        }
        if let Ok(mut core) = self.core.try_lock() {
            core.active = false;
            if let Some(task) = core.settle_task.take() {
                task.abort();
            }
        }
    }
}
