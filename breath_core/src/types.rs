//! Core domain types for the breathing-session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Phases and exercises
//! - Generated sequences
//! - Published session snapshots and transition events

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Phase and Exercise Types
// ============================================================================

/// One of the three timed stages of an exercise
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Inhale,
    Hold,
    Exhale,
}

impl Phase {
    /// All phases in play order
    pub const ORDER: [Phase; 3] = [Phase::Inhale, Phase::Hold, Phase::Exhale];

    /// The phase that follows this one within an exercise, if any
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Inhale => Some(Phase::Hold),
            Phase::Hold => Some(Phase::Exhale),
            Phase::Exhale => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Inhale",
            Phase::Hold => "Hold",
            Phase::Exhale => "Exhale",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A single inhale/hold/exhale timing triple
///
/// Exercises are only built by the sequence generator, so every field is
/// a positive number of seconds.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Exercise {
    inhale_seconds: u32,
    hold_seconds: u32,
    exhale_seconds: u32,
}

impl Exercise {
    pub(crate) fn new(inhale_seconds: u32, hold_seconds: u32, exhale_seconds: u32) -> Self {
        debug_assert!(inhale_seconds > 0 && hold_seconds > 0 && exhale_seconds > 0);
        Self {
            inhale_seconds,
            hold_seconds,
            exhale_seconds,
        }
    }

    pub fn inhale_seconds(&self) -> u32 {
        self.inhale_seconds
    }

    pub fn hold_seconds(&self) -> u32 {
        self.hold_seconds
    }

    pub fn exhale_seconds(&self) -> u32 {
        self.exhale_seconds
    }

    /// Duration of the given phase in seconds
    pub fn seconds_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Inhale => self.inhale_seconds,
            Phase::Hold => self.hold_seconds,
            Phase::Exhale => self.exhale_seconds,
        }
    }

    /// Phases paired with their durations, in play order
    pub fn phases(&self) -> [(Phase, u32); 3] {
        Phase::ORDER.map(|phase| (phase, self.seconds_for(phase)))
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.inhale_seconds)
            + u64::from(self.hold_seconds)
            + u64::from(self.exhale_seconds)
    }
}

// ============================================================================
// Sequence Type
// ============================================================================

/// Ordered, immutable list of exercises
///
/// Cloning is cheap: clones share the same backing slice.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Sequence(Arc<[Exercise]>);

impl Sequence {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Exercise> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Exercise> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Exercise] {
        &self.0
    }

    /// Sum of every phase of every exercise, in seconds
    pub fn total_seconds(&self) -> u64 {
        self.0.iter().map(Exercise::total_seconds).sum()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<Exercise>> for Sequence {
    fn from(exercises: Vec<Exercise>) -> Self {
        Self(Arc::from(exercises))
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Exercise;
    type IntoIter = std::slice::Iter<'a, Exercise>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Session State Types
// ============================================================================

/// Coarse lifecycle state of a session
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Generated but no countdown running
    Idle,
    /// A phase countdown is ticking
    Running,
    /// Countdown frozen, resumable
    Paused,
    /// Every exercise has been played or skipped
    Completed,
}

/// Immutable view of the session published to observers
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub sequence: Sequence,
    pub current_index: usize,
    pub current_phase: Phase,
    pub time_left: u32,
    pub is_paused: bool,
    pub is_running: bool,
    pub completion_notified: bool,
    pub generated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) run_epoch: u64,
}

impl SessionSnapshot {
    /// A fresh, not-yet-started session over `sequence`
    pub(crate) fn fresh(sequence: Sequence) -> Self {
        let now = Utc::now();
        let completed_at = sequence.is_empty().then_some(now);
        Self {
            session_id: Uuid::new_v4(),
            sequence,
            current_index: 0,
            current_phase: Phase::Inhale,
            time_left: 0,
            is_paused: false,
            is_running: false,
            completion_notified: false,
            generated_at: now,
            completed_at,
            run_epoch: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.current_index >= self.sequence.len()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_completed() {
            SessionStatus::Completed
        } else if self.is_paused {
            SessionStatus::Paused
        } else if self.is_running {
            SessionStatus::Running
        } else {
            SessionStatus::Idle
        }
    }

    /// The exercise at `current_index`, or `None` once completed
    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.sequence.get(self.current_index)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::fresh(Sequence::empty())
    }
}

/// Transitions emitted by the controller, in the order they were applied
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Generated {
        session_id: Uuid,
        exercises: usize,
        total_seconds: u64,
    },
    Started {
        index: usize,
    },
    PhaseStarted {
        index: usize,
        phase: Phase,
        seconds: u32,
    },
    /// One-second decrement of `time_left`
    Tick {
        index: usize,
        phase: Phase,
        time_left: u32,
    },
    ExerciseCompleted {
        index: usize,
    },
    ExerciseSkipped {
        index: usize,
    },
    Paused,
    Resumed,
    Completed,
    Disposed,
}
