//! Time-driven acquisition progress and synthetic spectrum data.
//!
//! Nothing runs in the background. `poll` and `read` derive how many samples
//! exist from the elapsed time since `start`, so progress is a pure function
//! of the supplied timestamp and the whole simulator stays deterministic
//! under an injected clock.

use crate::analyzer::spectrum::SpectrumDefinition;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Guards the sample-ready computation against binary rounding at exact
/// dwell boundaries.
const DWELL_EPSILON: f64 = 1e-9;

/// Lifecycle of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Completed,
}

impl JobState {
    /// Wire spelling used in `ControllerState`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

/// Snapshot returned by [`AcquisitionJob::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub state: JobState,
    pub samples_ready: usize,
    pub elapsed_fraction: f64,
}

/// A data read outside the legal index range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range [{from}, {to}] exceeds {sample_count} samples")]
    OutOfBounds {
        from: usize,
        to: usize,
        sample_count: usize,
    },

    #[error("sample {to} not yet acquired, {samples_ready} ready")]
    NotYetAvailable { to: usize, samples_ready: usize },
}

/// One running or completed acquisition.
///
/// Sample values are not stored; they are a deterministic function of the
/// definition and the sample index, recomputed on every read.
#[derive(Debug, Clone)]
pub struct AcquisitionJob {
    definition: SpectrumDefinition,
    started_at: DateTime<Utc>,
    state: JobState,
}

impl AcquisitionJob {
    /// Starts an acquisition at `now`.
    pub fn start(definition: SpectrumDefinition, now: DateTime<Utc>) -> Self {
        Self {
            definition,
            started_at: now,
            state: JobState::Running,
        }
    }

    /// The definition this job acquires.
    pub fn definition(&self) -> &SpectrumDefinition {
        &self.definition
    }

    /// Current lifecycle state as last observed by [`poll`](Self::poll).
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Seconds since the acquisition started, clamped at zero.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let micros = (now - self.started_at).num_microseconds().unwrap_or(i64::MAX);
        micros.max(0) as f64 / 1e6
    }

    /// Samples available at `now`. Sample `i` exists once the elapsed time
    /// reaches `i * dwell_time`, so the first sample is ready immediately.
    pub fn samples_ready(&self, now: DateTime<Utc>) -> usize {
        let elapsed = self.elapsed_secs(now);
        let by_time = (elapsed / self.definition.dwell_time + DWELL_EPSILON).floor() as usize + 1;
        by_time.min(self.definition.sample_count())
    }

    /// Observes progress at `now` and latches completion.
    ///
    /// The running to completed transition happens here the first time all
    /// samples are ready; it is one-directional, a completed job never
    /// reports running again.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Progress {
        let samples_ready = self.samples_ready(now);
        if samples_ready == self.definition.sample_count() {
            self.state = JobState::Completed;
        }
        let total = self.definition.total_time();
        let elapsed_fraction = if total > 0.0 {
            (self.elapsed_secs(now) / total).min(1.0)
        } else {
            1.0
        };
        Progress {
            state: self.state,
            samples_ready,
            elapsed_fraction,
        }
    }

    /// Returns samples `from..=to`.
    ///
    /// Bounds against the full spectrum are checked before availability, so
    /// a read past the end reports `OutOfBounds` even while samples are
    /// still being acquired.
    pub fn read(
        &self,
        from: usize,
        to: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<f64>, RangeError> {
        let sample_count = self.definition.sample_count();
        if to >= sample_count || from > to {
            return Err(RangeError::OutOfBounds {
                from,
                to,
                sample_count,
            });
        }
        let samples_ready = self.samples_ready(now);
        if to >= samples_ready {
            return Err(RangeError::NotYetAvailable { to, samples_ready });
        }
        Ok((from..=to)
            .map(|index| sample_value(&self.definition, index))
            .collect())
    }
}

/// Synthetic intensity for one sample.
///
/// A Gaussian peak centered mid-window, with pseudo-noise derived from the
/// sample energy and pass energy. Identical inputs always produce identical
/// values; counts never go negative.
pub fn sample_value(definition: &SpectrumDefinition, index: usize) -> f64 {
    let energy = definition.energy_at(index);
    let center = (definition.start_energy + definition.end_energy) / 2.0;
    let sigma = (definition.end_energy - definition.start_energy) / 6.0;
    let peak = 1000.0 * (-((energy - center).powi(2)) / (2.0 * sigma * sigma)).exp();
    let noise = peak * 0.05 * (energy * 37.0 + definition.pass_energy).sin();
    (peak + noise).max(0.0)
}
