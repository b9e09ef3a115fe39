//! Frame-driven detection loop with cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use signa_models::ClassificationEvent;

use super::clock::MonotonicClock;
use super::stats::{FpsCounter, LoopStats, TickOutcome};
use crate::classifier::{Classifier, RunningMode};
use crate::error::{VisionError, VisionResult};
use crate::frame::FrameSource;
use crate::metrics;

/// Detection loop configuration.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Tick period; one tick per rendered frame
    pub tick_interval: Duration,
    /// Bound on a single classifier call; an overrun counts as an idle tick
    pub classify_timeout: Duration,
    /// How long `stop()` waits for an in-flight tick before aborting it
    pub stop_grace: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16), // ~60 Hz display refresh
            classify_timeout: Duration::from_millis(250),
            stop_grace: Duration::from_millis(500),
        }
    }
}

impl LoopConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup. Zero or unparsable durations keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(
                lookup(key)
                    .and_then(|s| s.parse().ok())
                    .filter(|ms: &u64| *ms > 0)
                    .unwrap_or(default),
            )
        };
        Self {
            tick_interval: millis("SIGNA_TICK_INTERVAL_MS", 16),
            classify_timeout: millis("SIGNA_CLASSIFY_TIMEOUT_MS", 250),
            stop_grace: millis("SIGNA_STOP_GRACE_MS", 500),
        }
    }
}

/// Lifecycle state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoopState {
    #[default]
    Stopped,
    /// Waiting on camera acquisition.
    Starting,
    Running,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Stopped => "stopped",
            LoopState::Starting => "starting",
            LoopState::Running => "running",
        }
    }
}

/// Receiver of the loop's per-tick results.
///
/// Calls happen on the loop task, in tick order, and never after `stop()`
/// has returned.
pub trait DetectionSink: Send + Sync {
    /// A sign was recognised on this tick.
    fn on_event(&self, event: &ClassificationEvent);

    /// No sign was recognised on this tick.
    fn on_idle(&self) {}
}

/// Owns the camera lifecycle and drives the classifier at frame rate.
pub struct DetectionLoop {
    config: LoopConfig,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    classifier: Arc<dyn Classifier>,
    /// Set once the classifier has been moved to video mode; never reset.
    streaming: Arc<AtomicBool>,
    stats: Arc<StdMutex<LoopStats>>,
    state: LoopState,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl DetectionLoop {
    /// Create a stopped loop over a frame source and classifier.
    pub fn new(
        config: LoopConfig,
        source: Box<dyn FrameSource>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            classifier,
            streaming: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(StdMutex::new(LoopStats::default())),
            state: LoopState::Stopped,
            shutdown: None,
            task: None,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// True while the tick task is alive.
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Whether the classifier has been switched to video mode.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Counters for the current (or last) run.
    pub fn stats(&self) -> LoopStats {
        lock_stats(&self.stats).clone()
    }

    /// Whether the frame source currently holds the capture device.
    pub async fn is_device_active(&self) -> bool {
        self.source.lock().await.is_active()
    }

    /// Acquire the camera and start ticking.
    ///
    /// Fails with `ClassifierNotReady` if the model has not loaded, and with
    /// a camera error if the device cannot be opened. In both cases the loop
    /// stays stopped and `start()` may be retried.
    pub async fn start(&mut self, sink: Arc<dyn DetectionSink>) -> VisionResult<()> {
        if self.is_running() {
            return Err(VisionError::AlreadyRunning);
        }
        if !self.classifier.is_ready() {
            return Err(VisionError::not_ready(format!(
                "classifier '{}' has not finished loading",
                self.classifier.name()
            )));
        }

        self.state = LoopState::Starting;
        {
            let mut source = self.source.lock().await;
            if let Err(e) = source.acquire().await {
                metrics::record_camera_acquire(false);
                source.release();
                self.state = LoopState::Stopped;
                warn!(source = source.name(), error = %e, "Camera acquisition failed");
                return Err(e);
            }
            metrics::record_camera_acquire(true);
            info!(source = source.name(), "Camera acquired");
        }

        *lock_stats(&self.stats) = LoopStats::default();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = TickWorker {
            config: self.config.clone(),
            source: Arc::clone(&self.source),
            classifier: Arc::clone(&self.classifier),
            sink,
            shutdown: shutdown_rx,
            streaming: Arc::clone(&self.streaming),
            stats: Arc::clone(&self.stats),
            clock: MonotonicClock::new(),
            fps: FpsCounter::new(Instant::now()),
        };

        self.task = Some(tokio::spawn(worker.run()));
        self.shutdown = Some(shutdown_tx);
        self.state = LoopState::Running;

        info!(
            classifier = self.classifier.name(),
            tick_ms = self.config.tick_interval.as_millis() as u64,
            "Detection loop started"
        );
        Ok(())
    }

    /// Stop ticking and release the camera.
    ///
    /// Safe to call any number of times. When it returns, no further tick
    /// runs and the sink receives no further calls.
    pub async fn stop(&mut self) -> LoopStats {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.config.stop_grace, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => {
                    error!("Detection loop task panicked: {}", e);
                }
                Ok(Err(_)) => {}
                Err(_) => {
                    warn!(
                        grace_ms = self.config.stop_grace.as_millis() as u64,
                        "In-flight tick exceeded stop grace, aborting"
                    );
                    task.abort();
                    let _ = task.await;
                }
            }
        }

        {
            let mut source = self.source.lock().await;
            if source.is_active() {
                info!(source = source.name(), "Releasing camera");
            }
            source.release();
        }

        if self.state != LoopState::Stopped {
            info!("Detection loop stopped");
        }
        self.state = LoopState::Stopped;
        self.stats()
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Ok(mut source) = self.source.try_lock() {
            source.release();
        }
    }
}

fn lock_stats(stats: &StdMutex<LoopStats>) -> std::sync::MutexGuard<'_, LoopStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State owned by the spawned tick task.
struct TickWorker {
    config: LoopConfig,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn DetectionSink>,
    shutdown: watch::Receiver<bool>,
    streaming: Arc<AtomicBool>,
    stats: Arc<StdMutex<LoopStats>>,
    clock: MonotonicClock,
    fps: FpsCounter,
}

impl TickWorker {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval.max(Duration::from_millis(1)));
        // A slow classifier pushes the next tick back instead of bunching ticks up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            if self.is_cancelled() {
                break;
            }

            let outcome = self.tick().await;
            metrics::record_tick(outcome);
            lock_stats(&self.stats).record(outcome);

            if outcome == TickOutcome::Cancelled {
                break;
            }
        }

        debug!("Tick task exited");
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn tick(&mut self) -> TickOutcome {
        let frame = self.source.lock().await.current_frame();
        let frame = match frame {
            Some(frame) if !frame.is_empty() => frame,
            _ => return TickOutcome::NotReady,
        };

        if !self.streaming.load(Ordering::Acquire) {
            if let Err(e) = self.classifier.set_running_mode(RunningMode::Video) {
                warn!(error = %e, "Failed to switch classifier to video mode");
                return TickOutcome::Failed;
            }
            self.streaming.store(true, Ordering::Release);
            info!(classifier = self.classifier.name(), "Classifier switched to video mode");
        }

        let timestamp_ms = self.clock.next_ms();
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.config.classify_timeout,
            self.classifier.classify(&frame, timestamp_ms),
        )
        .await;
        metrics::record_classify_latency(started.elapsed());

        if self.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        let output = match result {
            Err(_) => {
                warn!(
                    timeout_ms = self.config.classify_timeout.as_millis() as u64,
                    frame = frame.sequence(),
                    "Classifier overran its budget, treating tick as idle"
                );
                self.sink.on_idle();
                return TickOutcome::TimedOut;
            }
            Ok(Err(e)) => {
                warn!(frame = frame.sequence(), error = %e, "Classifier failed, skipping tick");
                return TickOutcome::Failed;
            }
            Ok(Ok(output)) => output,
        };

        if let Some(fps) = self.fps.tick(Instant::now()) {
            metrics::record_fps(fps);
            lock_stats(&self.stats).fps = fps;
        }

        match output.top_candidate() {
            Some(candidate) => {
                let event = ClassificationEvent::new(
                    candidate.label.as_str(),
                    candidate.score,
                    timestamp_ms,
                );
                trace!(
                    label = %event.label,
                    confidence = event.confidence,
                    timestamp_ms,
                    "Gesture detected"
                );
                self.sink.on_event(&event);
                TickOutcome::Emitted
            }
            None => {
                self.sink.on_idle();
                TickOutcome::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierOutput, MockClassifier};
    use crate::error::ClassifierError;
    use crate::replay::{CameraFailure, ReplayClassifier, ReplayOutcome, SyntheticFrameSource};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingSink {
        events: StdMutex<Vec<ClassificationEvent>>,
        idle: AtomicUsize,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<ClassificationEvent> {
            self.events.lock().unwrap().clone()
        }

        fn calls(&self) -> usize {
            self.events.lock().unwrap().len() + self.idle.load(Ordering::SeqCst)
        }
    }

    impl DetectionSink for RecordingSink {
        fn on_event(&self, event: &ClassificationEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_idle(&self) {
            self.idle.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_millis(2),
            classify_timeout: Duration::from_millis(200),
            stop_grace: Duration::from_millis(500),
        }
    }

    fn source() -> Box<dyn FrameSource> {
        Box::new(SyntheticFrameSource::new(64, 48))
    }

    fn mock_classifier() -> MockClassifier {
        let mut mock = MockClassifier::new();
        mock.expect_is_ready().return_const(true);
        mock.expect_name().return_const("mock");
        mock
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_events_in_tick_order() {
        let classifier = ReplayClassifier::new(vec![
            ReplayOutcome::Detect(ClassifierOutput::single("A", 0.9)),
            ReplayOutcome::Detect(ClassifierOutput::single("B", 0.8)),
            ReplayOutcome::Detect(ClassifierOutput::empty()),
        ]);
        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(classifier));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let stats = detection.stop().await;

        let events = sink.events();
        assert!(events.len() >= 2, "expected events, got {:?}", stats);
        assert!(events.windows(2).all(|w| w[1].timestamp_ms > w[0].timestamp_ms));
        for pair in events.chunks(2).filter(|c| c.len() == 2) {
            assert_eq!(pair[0].label.as_str(), "A");
            assert_eq!(pair[1].label.as_str(), "B");
        }
        assert!(sink.idle.load(Ordering::SeqCst) > 0);
        assert_eq!(stats.emitted as usize, events.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_dimension_frames_are_skipped() {
        let source = SyntheticFrameSource::new(64, 48).with_warmup(3);
        let classifier = ReplayClassifier::new(vec![ReplayOutcome::Detect(
            ClassifierOutput::single("A", 0.9),
        )]);
        let mut detection = DetectionLoop::new(fast_config(), Box::new(source), Arc::new(classifier));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let stats = detection.stop().await;

        assert_eq!(stats.not_ready, 3);
        assert!(stats.emitted > 0);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switches_to_video_mode_exactly_once() {
        let mut mock = mock_classifier();
        mock.expect_set_running_mode()
            .withf(|mode| *mode == RunningMode::Video)
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_classify()
            .returning(|_, _| Ok(ClassifierOutput::single("A", 0.9)));

        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(mock));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        detection.stop().await;
        assert!(detection.is_streaming());

        // A second session reuses the streaming classifier.
        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        detection.stop().await;

        assert!(!sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_errors_do_not_stop_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut mock = mock_classifier();
        mock.expect_set_running_mode().returning(|_| Ok(()));
        mock.expect_classify().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(ClassifierError::inference_failed("bad tensor"))
            } else {
                Ok(ClassifierOutput::single("C", 0.7))
            }
        });

        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(mock));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(detection.is_running());
        let stats = detection.stop().await;

        assert!(stats.failed > 0);
        assert!(stats.emitted > 0);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_refuses_when_classifier_not_ready() {
        let classifier = ReplayClassifier::new(vec![]).not_ready();
        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(classifier));

        let err = detection
            .start(Arc::new(RecordingSink::default()))
            .await
            .unwrap_err();

        assert!(err.is_not_ready());
        assert_eq!(detection.state(), LoopState::Stopped);
        assert!(!detection.is_device_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_failure_leaves_loop_stopped() {
        let source = SyntheticFrameSource::new(64, 48).failing(CameraFailure::PermissionDenied);
        let classifier = ReplayClassifier::new(vec![]);
        let mut detection = DetectionLoop::new(fast_config(), Box::new(source), Arc::new(classifier));

        let err = detection
            .start(Arc::new(RecordingSink::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, VisionError::CameraPermissionDenied));
        assert!(err.is_camera_error());
        assert_eq!(detection.state(), LoopState::Stopped);
        assert!(!detection.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let classifier = ReplayClassifier::new(vec![]);
        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(classifier));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        let err = detection.start(sink).await.unwrap_err();
        assert!(matches!(err, VisionError::AlreadyRunning));
        detection.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_releases_device() {
        let classifier = ReplayClassifier::new(vec![ReplayOutcome::Detect(
            ClassifierOutput::single("A", 0.9),
        )]);
        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(classifier));

        detection.start(Arc::new(RecordingSink::default())).await.unwrap();
        assert!(detection.is_device_active().await);

        detection.stop().await;
        assert!(!detection.is_device_active().await);
        assert_eq!(detection.state(), LoopState::Stopped);

        detection.stop().await;
        assert!(!detection.is_device_active().await);
        assert_eq!(detection.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_callbacks_after_stop() {
        let classifier = ReplayClassifier::new(vec![ReplayOutcome::Detect(
            ClassifierOutput::single("A", 0.9),
        )]);
        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(classifier));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        detection.stop().await;

        let calls_at_stop = sink.calls();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(sink.calls(), calls_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_inflight_tick_drops_its_result() {
        let classifier = ReplayClassifier::new(vec![ReplayOutcome::Detect(
            ClassifierOutput::single("A", 0.9),
        )])
        .with_latency(Duration::from_millis(60));
        let mut detection = DetectionLoop::new(fast_config(), source(), Arc::new(classifier));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        let stats = detection.stop().await;

        assert_eq!(sink.calls(), 0);
        assert_eq!(stats.emitted, 0);
        assert_eq!(stats.cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_overrun_counts_as_idle() {
        let classifier = ReplayClassifier::new(vec![ReplayOutcome::Detect(
            ClassifierOutput::single("A", 0.9),
        )])
        .with_latency(Duration::from_millis(50));
        let config = LoopConfig {
            classify_timeout: Duration::from_millis(5),
            ..fast_config()
        };
        let mut detection = DetectionLoop::new(config, source(), Arc::new(classifier));
        let sink = Arc::new(RecordingSink::default());

        detection.start(sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let stats = detection.stop().await;

        assert!(stats.timed_out > 0);
        assert_eq!(stats.emitted, 0);
        assert!(sink.events().is_empty());
        assert!(sink.idle.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_config_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.tick_interval, Duration::from_millis(16));
        assert_eq!(config.classify_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_config_rejects_zero_durations() {
        let vars: HashMap<&str, &str> = [
            ("SIGNA_TICK_INTERVAL_MS", "0"),
            ("SIGNA_CLASSIFY_TIMEOUT_MS", "0"),
            ("SIGNA_STOP_GRACE_MS", "0"),
        ]
        .into_iter()
        .collect();
        let config = LoopConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.tick_interval, Duration::from_millis(16));
        assert_eq!(config.classify_timeout, Duration::from_millis(250));
        assert_eq!(config.stop_grace, Duration::from_millis(500));
    }

    #[test]
    fn test_config_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SIGNA_CLASSIFY_TIMEOUT_MS", "40"),
            ("SIGNA_STOP_GRACE_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config = LoopConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.classify_timeout, Duration::from_millis(40));
        assert_eq!(config.stop_grace, Duration::from_millis(500));
    }
}
