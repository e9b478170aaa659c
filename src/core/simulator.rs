//! Timer-driven traffic simulation
//!
//! A [`Simulator`] owns the device profile, the rolling log and the generator
//! behind one mutex, and drives them from a single cancellable Tokio task.
//!
//! # Scheduling
//!
//! Every (re)schedule cancels the previous task and bumps an epoch counter.
//! A tick carries the epoch it was scheduled under and is discarded if the
//! epoch has moved on, so two timers never both contribute events. Pausing
//! cancels the task outright; missed ticks are never replayed.
//!
//! # Observation
//!
//! Each mutation publishes a fresh [`SimulationSnapshot`] through a
//! [`tokio::sync::watch`] channel. Renderers call [`Simulator::subscribe`] and
//! never touch the state directly.
//!
//! # Example
//!
//! ```no_run
//! use fireguard::core::simulator::Simulator;
//!
//! # async fn demo() -> fireguard::Result<()> {
//! let simulator = Simulator::default();
//! let mut updates = simulator.subscribe();
//! simulator.start()?;
//!
//! updates.changed().await.ok();
//! println!("{} events", updates.borrow().events.len());
//! # Ok(())
//! # }
//! ```

use crate::config::AppConfig;
use crate::core::error::{Error, Result};
use crate::core::generator::{TrafficGenerator, tick_interval};
use crate::core::traffic::{DeviceProfile, ProfileUpdate, TrafficEvent};
use crate::core::traffic_log::{LogFilter, TrafficLog, TrafficSummary};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Lifecycle of the generation timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunState {
    /// Never started
    #[default]
    Idle,
    Running,
    Paused,
}

impl RunState {
    pub const fn is_running(self) -> bool {
        matches!(self, RunState::Running)
    }
}

/// Read-only view of the simulation published after every change
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationSnapshot {
    pub run_state: RunState,
    pub profile: DeviceProfile,
    /// Newest-first
    pub events: Vec<TrafficEvent>,
    pub summary: TrafficSummary,
    pub total_generated: u64,
    /// Schedule generation; bumps on every start, resume and reschedule
    pub epoch: u64,
}

impl SimulationSnapshot {
    fn capture(state: &State) -> Self {
        Self {
            run_state: state.run_state,
            profile: state.profile.clone(),
            events: state.log.to_vec(),
            summary: state.log.summary(),
            total_generated: state.generator.generated(),
            epoch: state.epoch,
        }
    }

    pub fn filtered(&self, filter: LogFilter) -> impl Iterator<Item = &TrafficEvent> {
        self.events.iter().filter(move |event| filter.matches(event))
    }

    /// Current tick period derived from the profile
    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.profile.activity_level)
    }
}

/// Handle to the running generator task
#[derive(Debug)]
struct GeneratorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl GeneratorTask {
    fn stop(self) {
        self.cancel.cancel();
        // The task exits on its own; dropping the handle detaches it
        drop(self.handle);
    }
}

#[derive(Debug)]
struct State {
    profile: DeviceProfile,
    log: TrafficLog,
    generator: TrafficGenerator,
    run_state: RunState,
    epoch: u64,
    task: Option<GeneratorTask>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    snapshots: watch::Sender<Arc<SimulationSnapshot>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent across a panicking holder: every mutation is
        // a single field assignment or a log push
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.snapshots
            .send_replace(Arc::new(SimulationSnapshot::capture(state)));
    }

    /// Runs one tick. Returns `false` when the task that fired it is stale.
    fn tick(&self, epoch: u64) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || !state.run_state.is_running() {
            tracing::debug!(epoch, current = state.epoch, "Discarding stale tick");
            return false;
        }

        let State {
            profile,
            log,
            generator,
            ..
        } = &mut *state;
        let batch = generator.generate_batch(profile);
        let threats = batch.iter().filter(|e| e.is_threat()).count();
        tracing::trace!(events = batch.len(), threats, "Generated batch");
        log.push_batch(batch);

        self.publish(&state);
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.task.take() {
            task.stop();
        }
    }
}

/// Shared, cloneable simulation controller
#[derive(Debug, Clone)]
pub struct Simulator {
    inner: Arc<Inner>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(
            DeviceProfile::default(),
            TrafficGenerator::from_entropy(),
            TrafficLog::default(),
        )
    }
}

impl Simulator {
    pub fn new(profile: DeviceProfile, generator: TrafficGenerator, log: TrafficLog) -> Self {
        let state = State {
            profile,
            log,
            generator,
            run_state: RunState::Idle,
            epoch: 0,
            task: None,
        };
        let (snapshots, _) = watch::channel(Arc::new(SimulationSnapshot::capture(&state)));

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                snapshots,
            }),
        }
    }

    /// Builds a simulator from the saved profile, weights, log capacity and
    /// optional seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the configured weights are unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.weights.validate()?;
        let generator = match config.seed {
            Some(seed) => TrafficGenerator::seeded(seed),
            None => TrafficGenerator::from_entropy(),
        }
        .with_weights(config.weights);

        Ok(Self::new(
            config.profile.clone(),
            generator,
            TrafficLog::with_capacity(config.log_capacity),
        ))
    }

    /// Clears the log and (re)starts generation, whatever the current state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when called outside a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = current_runtime()?;
        let mut state = self.inner.lock();
        state.log.clear();
        self.schedule(&mut state, &runtime);
        tracing::info!(profile = %state.profile.describe(), "Simulation started");
        self.inner.publish(&state);
        Ok(())
    }

    /// Stops generation, keeping the log. No-op unless running.
    pub fn pause(&self) {
        let mut state = self.inner.lock();
        if !state.run_state.is_running() {
            return;
        }
        if let Some(task) = state.task.take() {
            task.stop();
        }
        state.run_state = RunState::Paused;
        tracing::info!(events = state.log.len(), "Simulation paused");
        self.inner.publish(&state);
    }

    /// Continues generation without clearing the log. Also starts an idle
    /// simulator. No-op if already running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when called outside a Tokio runtime.
    pub fn resume(&self) -> Result<()> {
        let runtime = current_runtime()?;
        let mut state = self.inner.lock();
        if state.run_state.is_running() {
            return Ok(());
        }
        self.schedule(&mut state, &runtime);
        tracing::info!(events = state.log.len(), "Simulation resumed");
        self.inner.publish(&state);
        Ok(())
    }

    /// Pauses a running simulation, resumes anything else. Returns the new
    /// state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when resuming outside a Tokio runtime.
    pub fn toggle(&self) -> Result<RunState> {
        if self.run_state().is_running() {
            self.pause();
        } else {
            self.resume()?;
        }
        Ok(self.run_state())
    }

    /// Empties the log without touching the run state.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.log.clear();
        tracing::debug!("Traffic log cleared");
        self.inner.publish(&state);
    }

    /// Applies a single profile change. The next tick picks it up; an
    /// activity level change on a running simulation reschedules the timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if a reschedule is needed outside a Tokio
    /// runtime. The profile change is kept either way.
    pub fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        let mut state = self.inner.lock();
        let level_changed = state.profile.apply(update);
        let outcome = if level_changed && state.run_state.is_running() {
            current_runtime().map(|runtime| {
                tracing::info!(level = %state.profile.activity_level, "Activity level changed");
                self.schedule(&mut state, &runtime);
            })
        } else {
            Ok(())
        };
        self.inner.publish(&state);
        outcome
    }

    pub fn run_state(&self) -> RunState {
        self.inner.lock().run_state
    }

    pub fn profile(&self) -> DeviceProfile {
        self.inner.lock().profile.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<SimulationSnapshot> {
        self.inner.snapshots.borrow().clone()
    }

    /// Change subscription for renderers
    pub fn subscribe(&self) -> watch::Receiver<Arc<SimulationSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    /// Cancels the current task (if any) and spawns one for a new epoch.
    fn schedule(&self, state: &mut State, runtime: &Handle) {
        if let Some(task) = state.task.take() {
            task.stop();
        }
        state.epoch += 1;
        state.run_state = RunState::Running;

        let period = tick_interval(state.profile.activity_level);
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(generator_task(
            Arc::downgrade(&self.inner),
            state.epoch,
            period,
            cancel.clone(),
        ));
        tracing::debug!(
            epoch = state.epoch,
            period_ms = period.as_millis(),
            "Generator scheduled"
        );
        state.task = Some(GeneratorTask { cancel, handle });
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current()
        .map_err(|e| Error::Runtime(format!("simulation needs a Tokio runtime: {e}")))
}

/// Periodic generation loop for one epoch
async fn generator_task(
    inner: Weak<Inner>,
    epoch: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    // First tick one full period after scheduling, like a browser interval
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                if !inner.tick(epoch) {
                    break;
                }
            }
        }
    }
    tracing::trace!(epoch, "Generator task exited");
}
