//! Per-parameter timing vector.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};

/// Two times closer than this (in seconds) are both marked as minima when
/// displayed.
pub const DISPLAY_TOLERANCE_SECS: f64 = 0.00001;

/// Measured times for one (modulus bit-length, exponent bit-length) pair.
///
/// Entry `i` holds the elapsed time for block width `i + 1`. The caller
/// appends widths in increasing order; the vector does not check this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimingVector {
    times: Vec<f64>,
}

impl TimingVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from times ordered by block width.
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> Result<Self> {
        let mut vector = Self::new();
        for time in times {
            vector.add(time)?;
        }
        Ok(vector)
    }

    /// Append the time measured for the next block width.
    ///
    /// # Errors
    /// Returns [`TuneError::InvalidTime`] for NaN, infinite or negative times.
    pub fn add(&mut self, time: f64) -> Result<()> {
        if !time.is_finite() || time < 0.0 {
            return Err(TuneError::InvalidTime { time });
        }
        self.times.push(time);
        Ok(())
    }

    /// Number of block widths measured.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether no block width has been measured yet.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Times ordered by block width.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// 1-based block width with the smallest time.
    ///
    /// Only a strictly smaller time replaces the current best, so among equal
    /// minima the smallest block width wins.
    ///
    /// # Errors
    /// Returns [`TuneError::EmptyTimingVector`] if nothing was measured.
    pub fn best_block_width(&self) -> Result<usize> {
        let (&first, rest) = self
            .times
            .split_first()
            .ok_or(TuneError::EmptyTimingVector)?;

        let mut best_index = 0;
        let mut best_time = first;
        for (i, &time) in rest.iter().enumerate() {
            if time < best_time {
                best_time = time;
                best_index = i + 1;
            }
        }
        Ok(best_index + 1)
    }

    /// Smallest measured time.
    pub fn minimum(&self) -> Result<f64> {
        self.times
            .iter()
            .copied()
            .reduce(f64::min)
            .ok_or(TuneError::EmptyTimingVector)
    }

    /// 1-based block widths whose time is within [`DISPLAY_TOLERANCE_SECS`] of
    /// the minimum. Empty for an empty vector.
    pub fn minima(&self) -> Vec<usize> {
        let Ok(min) = self.minimum() else {
            return Vec::new();
        };
        self.times
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t <= min + DISPLAY_TOLERANCE_SECS)
            .map(|(i, _)| i + 1)
            .collect()
    }
}
