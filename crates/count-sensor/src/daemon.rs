//! Count Sensor Daemon: the background poll loop
//!
//! This module owns the generation lifecycle (start, reconfigure, shutdown),
//! the supervisory restart loop and the inner poll loop that feeds the
//! snapshot cell.

use crate::config::SensorConfig;
use crate::error::{NotReady, Result, SensorError};
use crate::metrics::{PollRecorder, PollStats};
use crate::snapshot::{Readings, Snapshot, SnapshotCell};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use summary_core_count::CountRules;
use summary_core_interface::{DetectionSource, Extra, SourceError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Waits shorter than this are skipped rather than slept
const MIN_WAIT: Duration = Duration::from_micros(1);

/// Lifecycle state of a [`CountSensor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Stopped,
    Running,
}

/// State shared between the sensor handle and every generation's task
#[derive(Debug, Default)]
struct Shared {
    snapshot: SnapshotCell,
    recorder: PollRecorder,
}

/// A running generation: its token and the task it is joined through
struct Generation {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Everything one generation's loop needs, fixed for its lifetime
struct PollContext {
    sensor: String,
    generation: u64,
    camera: String,
    source: Arc<dyn DetectionSource>,
    rules: CountRules,
    interval: Duration,
    shared: Arc<Shared>,
}

/// A sensor that keeps the latest detection count for one camera.
///
/// Reads are synchronous and never wait on the background task. Lifecycle
/// calls (`reconfigure`, `shutdown`) are serialized with each other.
pub struct CountSensor {
    name: String,
    shared: Arc<Shared>,

    /// Token of the live generation, checked by readers without awaiting
    active: RwLock<CancellationToken>,

    /// The live generation, `None` once shut down
    generation: Mutex<Option<Generation>>,
}

impl CountSensor {
    /// Validate `config` and launch the first generation.
    ///
    /// Returns as soon as the background task is spawned; it does not wait for
    /// the first poll. Must be called from within a tokio runtime.
    pub fn start(
        name: impl Into<String>,
        config: SensorConfig,
        source: Arc<dyn DetectionSource>,
    ) -> Result<Self> {
        config.validate()?;

        let name = name.into();
        let shared = Arc::new(Shared::default());
        let generation = launch(&name, 1, &config, source, shared.clone());

        Ok(Self {
            name,
            shared,
            active: RwLock::new(generation.token.clone()),
            generation: Mutex::new(Some(generation)),
        })
    }

    /// Replace the running generation with one built from `config`.
    ///
    /// The config is validated first; an invalid config leaves the current
    /// generation untouched. Otherwise the current generation is cancelled and
    /// fully joined before the new one starts, so at most one loop ever runs.
    /// Reconfiguring a stopped sensor starts it again.
    pub async fn reconfigure(
        &self,
        config: SensorConfig,
        source: Arc<dyn DetectionSource>,
    ) -> Result<()> {
        config.validate()?;

        let mut slot = self.generation.lock().await;
        if let Some(previous) = slot.take() {
            if let Err(e) = retire(&self.name, previous).await {
                error!(sensor = %self.name, error = %e, "previous generation did not exit cleanly");
            }
        }

        let next = self.shared.recorder.generation() + 1;
        let generation = launch(&self.name, next, &config, source, self.shared.clone());
        *self.active.write() = generation.token.clone();
        *slot = Some(generation);

        Ok(())
    }

    /// Cancel the running generation and wait for its task to exit.
    ///
    /// Reads fail with [`NotReady::Disconnected`] afterwards. Calling this on a
    /// stopped sensor is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let mut slot = self.generation.lock().await;
        match slot.take() {
            Some(generation) => retire(&self.name, generation).await,
            None => Ok(()),
        }
    }

    /// Copy of the latest snapshot.
    ///
    /// Fails when `caller` is already cancelled, when the sensor's generation
    /// has been torn down, or before the first poll has completed. Never
    /// blocks on the background task.
    pub fn read_snapshot(&self, caller: &CancellationToken) -> Result<Snapshot> {
        if caller.is_cancelled() {
            return Err(NotReady::CallerCancelled.into());
        }
        if self.active.read().is_cancelled() {
            return Err(NotReady::Disconnected.into());
        }
        self.shared
            .snapshot
            .load()
            .ok_or(SensorError::NotReady(NotReady::AwaitingFirstPoll))
    }

    /// The latest snapshot as `{"label": ..., "count": ...}`
    pub fn readings(&self, caller: &CancellationToken) -> Result<Readings> {
        self.read_snapshot(caller).map(|snapshot| snapshot.to_readings())
    }

    pub fn state(&self) -> SensorState {
        if self.active.read().is_cancelled() {
            SensorState::Stopped
        } else {
            SensorState::Running
        }
    }

    pub fn stats(&self) -> PollStats {
        self.shared.recorder.snapshot()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CountSensor {
    fn drop(&mut self) {
        // the task cannot be joined here, but it will exit on its own
        self.active.get_mut().cancel();
    }
}

/// Build a generation's context and spawn its supervisor
fn launch(
    sensor: &str,
    id: u64,
    config: &SensorConfig,
    source: Arc<dyn DetectionSource>,
    shared: Arc<Shared>,
) -> Generation {
    let token = CancellationToken::new();
    shared.recorder.begin_generation(id);

    info!(
        sensor = %sensor,
        generation = id,
        detector = %source.name(),
        camera = %config.camera_name,
        frequency_hz = config.poll_frequency(),
        "count sensor generation starting"
    );

    let ctx = Arc::new(PollContext {
        sensor: sensor.to_string(),
        generation: id,
        camera: config.camera_name.clone(),
        source,
        rules: config.rules(),
        interval: config.poll_interval(),
        shared,
    });
    let handle = tokio::spawn(supervise(ctx, token.clone()));

    Generation { id, token, handle }
}

/// Cancel a generation and join its task
async fn retire(sensor: &str, generation: Generation) -> Result<()> {
    generation.token.cancel();
    match generation.handle.await {
        Ok(()) => {
            debug!(sensor = %sensor, generation = generation.id, "generation joined");
            Ok(())
        }
        Err(e) => Err(SensorError::Internal(format!(
            "poll loop of generation {} failed: {}",
            generation.id, e
        ))),
    }
}

/// Restart the poll loop after every detector failure until cancelled.
///
/// Each run of the loop is its own task, so a panicking detector ends that
/// run only and is restarted like any other failure.
async fn supervise(ctx: Arc<PollContext>, token: CancellationToken) {
    loop {
        let run = tokio::spawn(poll_loop(ctx.clone(), token.clone()));
        match run.await {
            Ok(Ok(())) => break,
            Ok(Err(e)) => restart(&ctx, &e),
            Err(e) if e.is_panic() => restart(&ctx, &e),
            // the runtime is shutting down
            Err(_) => break,
        }
        // no backoff, but let the canceller and other tasks run
        tokio::task::yield_now().await;
    }

    let stats = ctx.shared.recorder.snapshot();
    info!(
        sensor = %ctx.sensor,
        generation = ctx.generation,
        stats = %stats.summary(),
        "count sensor generation stopped"
    );
}

fn restart(ctx: &PollContext, e: &(dyn std::error::Error + 'static)) {
    ctx.shared.recorder.record_failure(e);
    error!(
        sensor = %ctx.sensor,
        generation = ctx.generation,
        error = %e,
        "background poll loop exited with error, restarting"
    );
}

/// Poll, count, publish and wait, until cancelled or the detector fails.
///
/// `Ok(())` means the token was cancelled.
async fn poll_loop(
    ctx: Arc<PollContext>,
    token: CancellationToken,
) -> std::result::Result<(), SourceError> {
    let extra = Extra::new();

    loop {
        if token.is_cancelled() {
            return Ok(());
        }

        let started = Instant::now();
        let detections = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            result = ctx.source.detections_from_camera(&ctx.camera, &extra) => result?,
        };

        let tally = ctx.rules.count(&detections);
        let took = started.elapsed();
        trace!(
            sensor = %ctx.sensor,
            detections = detections.len(),
            count = tally.count,
            label = %tally.label,
            "poll complete"
        );
        ctx.shared.snapshot.publish(Snapshot::new(tally.label, tally.count));
        ctx.shared.recorder.record_success(took);

        let wait = ctx.interval.saturating_sub(took);
        if wait > MIN_WAIT {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(wait) => {}
            }
        } else {
            tokio::task::yield_now().await;
        }
    }
}
