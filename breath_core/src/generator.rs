//! Sequence generation under a time budget.
//!
//! Exercises are drawn at random and packed greedily: drawing stops at the
//! first candidate that would push the total past the budget.

use crate::config::{GeneratorConfig, PhaseRange, MAX_DURATION_MINUTES};
use crate::{Exercise, Result, Sequence};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds exercise sequences from a duration in minutes
///
/// Generic over the random source so callers can inject a seeded RNG for
/// deterministic plans.
#[derive(Debug)]
pub struct SequenceGenerator<R = StdRng> {
    ranges: GeneratorConfig,
    rng: R,
}

impl SequenceGenerator<StdRng> {
    /// Generator with a deterministic, seeded RNG
    pub fn seeded(ranges: GeneratorConfig, seed: u64) -> Result<Self> {
        Self::new(ranges, StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the operating system
    pub fn from_os_rng(ranges: GeneratorConfig) -> Result<Self> {
        Self::new(ranges, StdRng::from_os_rng())
    }
}

impl<R: Rng> SequenceGenerator<R> {
    pub fn new(ranges: GeneratorConfig, rng: R) -> Result<Self> {
        ranges.validate()?;
        Ok(Self { ranges, rng })
    }

    pub fn ranges(&self) -> &GeneratorConfig {
        &self.ranges
    }

    /// Generate a sequence fitting within `duration_minutes * 60` seconds
    ///
    /// Non-positive durations yield an empty sequence; durations above
    /// [`MAX_DURATION_MINUTES`] are capped.
    pub fn generate(&mut self, duration_minutes: i64) -> Sequence {
        if duration_minutes > MAX_DURATION_MINUTES {
            tracing::warn!(
                "Duration of {} minutes capped at {}",
                duration_minutes,
                MAX_DURATION_MINUTES
            );
        }
        let budget = budget_seconds(duration_minutes);
        let mut accumulated: u64 = 0;
        let mut exercises = Vec::new();

        loop {
            let candidate = self.draw();
            let total = candidate.total_seconds();
            if accumulated + total > budget {
                break;
            }
            accumulated += total;
            exercises.push(candidate);
        }

        tracing::debug!(
            "Generated {} exercises ({}s of {}s budget)",
            exercises.len(),
            accumulated,
            budget
        );

        Sequence::from(exercises)
    }

    fn draw(&mut self) -> Exercise {
        let inhale = sample(&mut self.rng, self.ranges.inhale);
        let hold = sample(&mut self.rng, self.ranges.hold);
        let exhale = sample(&mut self.rng, self.ranges.exhale);
        Exercise::new(inhale, hold, exhale)
    }
}

fn sample<R: Rng>(rng: &mut R, range: PhaseRange) -> u32 {
    rng.random_range(range.min..=range.max)
}

/// Seconds available for `duration_minutes`
///
/// Zero when non-positive, capped at [`MAX_DURATION_MINUTES`].
pub fn budget_seconds(duration_minutes: i64) -> u64 {
    let minutes = duration_minutes.clamp(0, MAX_DURATION_MINUTES);
    u64::try_from(minutes * 60).unwrap_or(0)
}
