//! Session controller: phase state machine and countdown task.
//!
//! All session state lives in a single watch channel. Every write, whether
//! from the countdown task or from a control call, goes through the
//! channel's atomic modify. Each spawned countdown owns a run epoch and
//! only writes while its epoch is current, so `skip_exercise`, `dispose`
//! and `generate` can retire a running countdown without it touching the
//! next exercise's state.

use crate::config::Timing;
use crate::generator::SequenceGenerator;
use crate::{Config, Phase, Result, Sequence, SessionEvent, SessionSnapshot};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// Buffered events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 256;

/// Drives a generated sequence through its inhale/hold/exhale countdowns
pub struct SessionController<R = StdRng> {
    generator: Mutex<SequenceGenerator<R>>,
    timing: Timing,
    shared: Arc<Shared>,
    active: Mutex<Option<CancellationToken>>,
}

impl SessionController<StdRng> {
    /// Controller with an OS-seeded generator and the configured timing
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let generator = SequenceGenerator::from_os_rng(config.generator)?;
        Ok(Self::with_generator(generator, config.session.timing()))
    }

    /// Controller whose sequences are reproducible from `seed`
    pub fn seeded(config: &Config, seed: u64) -> Result<Self> {
        config.validate()?;
        let generator = SequenceGenerator::seeded(config.generator, seed)?;
        Ok(Self::with_generator(generator, config.session.timing()))
    }
}

impl<R> SessionController<R> {
    pub fn with_generator(generator: SequenceGenerator<R>, timing: Timing) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            generator: Mutex::new(generator),
            timing,
            shared: Arc::new(Shared {
                state,
                events: EventBus(events),
            }),
            active: Mutex::new(None),
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Current state of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every applied state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state.subscribe()
    }

    /// Receiver for the ordered stream of transitions
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.0.subscribe()
    }

    /// Replace the session with a fresh, not-yet-started one over `sequence`
    pub(crate) fn load(&self, sequence: Sequence) {
        let mut active = lock(&self.active);
        if let Some(token) = active.take() {
            token.cancel();
        }

        let fresh = SessionSnapshot::fresh(sequence);
        tracing::info!(
            "Generated session {} with {} exercises ({}s)",
            fresh.session_id,
            fresh.sequence.len(),
            fresh.sequence.total_seconds()
        );

        self.shared.modify(|state, events| {
            let epoch = state.run_epoch + 1;
            events.emit(SessionEvent::Generated {
                session_id: fresh.session_id,
                exercises: fresh.sequence.len(),
                total_seconds: fresh.sequence.total_seconds(),
            });
            *state = fresh;
            state.run_epoch = epoch;
            true
        });
    }

    /// Start (or continue) playing from the current exercise
    ///
    /// No-op while a countdown is already running. On a completed session
    /// `on_completed` runs only if this completion has not been reported
    /// yet. Fails only when called outside a Tokio runtime.
    pub fn start<F>(&self, on_completed: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = Handle::try_current()?;

        let mut active = lock(&self.active);
        let mut outcome = StartOutcome::AlreadyRunning;
        self.shared.modify(|state, events| {
            if state.is_running {
                return false;
            }
            if state.is_completed() {
                if state.completion_notified {
                    outcome = StartOutcome::AlreadyNotified;
                    return false;
                }
                state.completion_notified = true;
                state.completed_at.get_or_insert_with(Utc::now);
                events.emit(SessionEvent::Completed);
                outcome = StartOutcome::NotifyNow;
                return true;
            }
            state.run_epoch += 1;
            state.is_running = true;
            events.emit(SessionEvent::Started {
                index: state.current_index,
            });
            outcome = StartOutcome::Spawn {
                epoch: state.run_epoch,
                index: state.current_index,
            };
            true
        });

        match outcome {
            StartOutcome::AlreadyRunning => {
                tracing::debug!("Countdown already running, ignoring start");
            }
            StartOutcome::AlreadyNotified => {
                tracing::debug!("Session already completed and reported, ignoring start");
            }
            StartOutcome::NotifyNow => {
                drop(active);
                tracing::info!("Session completed without a countdown");
                on_completed();
            }
            StartOutcome::Spawn { epoch, index } => {
                tracing::info!("Starting countdown at exercise {}", index);
                let token = CancellationToken::new();
                *active = Some(token.clone());
                runtime.spawn(run_countdown(
                    Arc::clone(&self.shared),
                    epoch,
                    token,
                    self.timing,
                    on_completed,
                ));
            }
        }

        Ok(())
    }

    pub fn pause(&self) {
        self.shared.modify(|state, events| {
            if state.is_paused {
                return false;
            }
            state.is_paused = true;
            events.emit(SessionEvent::Paused);
            true
        });
    }

    pub fn resume(&self) {
        self.shared.modify(|state, events| {
            if !state.is_paused {
                return false;
            }
            state.is_paused = false;
            events.emit(SessionEvent::Resumed);
            true
        });
    }

    /// Abandon the current exercise and move to the next one
    ///
    /// Cancels any running countdown first. Play does not resume on its
    /// own; call [`start`](Self::start) again. The index never moves past
    /// the end of the sequence.
    pub fn skip_exercise(&self) {
        let mut active = lock(&self.active);
        self.shared.modify(|state, events| {
            state.run_epoch += 1;
            state.is_running = false;
            state.current_phase = Phase::Inhale;
            state.time_left = 0;
            if state.current_index < state.sequence.len() {
                events.emit(SessionEvent::ExerciseSkipped {
                    index: state.current_index,
                });
                state.current_index += 1;
            }
            if state.is_completed() {
                state.completed_at.get_or_insert_with(Utc::now);
            }
            true
        });
        if let Some(token) = active.take() {
            token.cancel();
        }

        let snapshot = self.shared.state.borrow();
        tracing::info!(
            "Skipped to exercise {} of {}",
            snapshot.current_index,
            snapshot.sequence.len()
        );
    }

    /// Stop the running countdown for good
    ///
    /// After this returns the countdown makes no further state changes and
    /// never calls its completion callback.
    pub fn dispose(&self) {
        let mut active = lock(&self.active);
        let was_running = self.shared.modify(|state, events| {
            state.run_epoch += 1;
            let was_running = state.is_running;
            state.is_running = false;
            if was_running {
                events.emit(SessionEvent::Disposed);
            }
            was_running
        });
        if let Some(token) = active.take() {
            token.cancel();
        }
        if was_running {
            tracing::info!("Disposed running countdown");
        }
    }
}

impl<R: Rng> SessionController<R> {
    /// Generate a new sequence and reset the session to Idle
    ///
    /// Any running countdown is cancelled. A non-positive duration yields
    /// an empty, already completed session.
    pub fn generate(&self, duration_minutes: i64) {
        let sequence = lock(&self.generator).generate(duration_minutes);
        self.load(sequence);
    }
}

impl<R> Drop for SessionController<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

enum StartOutcome {
    AlreadyRunning,
    AlreadyNotified,
    NotifyNow,
    Spawn { epoch: u64, index: usize },
}

struct EventBus(broadcast::Sender<SessionEvent>);

impl EventBus {
    fn emit(&self, event: SessionEvent) {
        // Having no subscribers is normal
        let _ = self.0.send(event);
    }
}

struct Shared {
    state: watch::Sender<SessionSnapshot>,
    events: EventBus,
}

impl Shared {
    /// Atomically modify the state; `f` returns whether anything changed
    fn modify(&self, f: impl FnOnce(&mut SessionSnapshot, &EventBus) -> bool) -> bool {
        self.state.send_if_modified(|state| f(state, &self.events))
    }

    /// Modify the state only if `epoch` still owns the session
    fn apply<T>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut SessionSnapshot, &EventBus) -> T,
    ) -> Option<T> {
        let mut out = None;
        self.modify(|state, events| {
            if state.run_epoch != epoch {
                return false;
            }
            out = Some(f(state, events));
            true
        });
        out
    }

    /// Read the state only if `epoch` still owns the session
    fn read<T>(&self, epoch: u64, f: impl FnOnce(&SessionSnapshot) -> T) -> Option<T> {
        let state = self.state.borrow();
        (state.run_epoch == epoch).then(|| f(&state))
    }
}

async fn run_countdown<F>(
    shared: Arc<Shared>,
    epoch: u64,
    cancel: CancellationToken,
    timing: Timing,
    on_completed: F,
) where
    F: FnOnce(),
{
    loop {
        let current = shared.read(epoch, |state| {
            state
                .current_exercise()
                .copied()
                .map(|exercise| (state.current_index, exercise))
        });
        let (index, exercise) = match current {
            None => return,
            Some(None) => break,
            Some(Some(current)) => current,
        };

        for (phase, seconds) in exercise.phases() {
            let entered = shared.apply(epoch, |state, events| {
                state.current_phase = phase;
                state.time_left = seconds;
                events.emit(SessionEvent::PhaseStarted {
                    index,
                    phase,
                    seconds,
                });
            });
            if entered.is_none() {
                return;
            }
            tracing::debug!("Exercise {}: {} for {}s", index, phase, seconds);

            if !count_down(&shared, epoch, &cancel, timing, index, phase).await {
                return;
            }
        }

        let advanced = shared.apply(epoch, |state, events| {
            state.current_index += 1;
            events.emit(SessionEvent::ExerciseCompleted { index });
        });
        if advanced.is_none() {
            return;
        }
    }

    let report = shared.apply(epoch, |state, events| {
        state.is_running = false;
        state.completed_at.get_or_insert_with(Utc::now);
        if state.completion_notified {
            return false;
        }
        state.completion_notified = true;
        events.emit(SessionEvent::Completed);
        true
    });
    if report == Some(true) {
        tracing::info!("Session completed");
        on_completed();
    }
}

/// Run one phase down to zero; false if the countdown was retired
async fn count_down(
    shared: &Shared,
    epoch: u64,
    cancel: &CancellationToken,
    timing: Timing,
    index: usize,
    phase: Phase,
) -> bool {
    loop {
        let Some((time_left, paused)) = shared.read(epoch, |s| (s.time_left, s.is_paused)) else {
            return false;
        };
        if time_left == 0 {
            return true;
        }
        if paused {
            if !wait(cancel, timing.pause_poll).await {
                return false;
            }
            continue;
        }
        if !wait(cancel, timing.tick).await {
            return false;
        }

        // A pause that landed mid-tick discards the partial second.
        let ticked = shared.apply(epoch, |state, events| {
            if state.is_paused || state.time_left == 0 {
                return;
            }
            state.time_left -= 1;
            events.emit(SessionEvent::Tick {
                index,
                phase,
                time_left: state.time_left,
            });
        });
        if ticked.is_none() {
            return false;
        }
    }
}

/// Sleep for `period`; false if cancelled first
async fn wait(cancel: &CancellationToken, period: Duration) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(period) => true,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
