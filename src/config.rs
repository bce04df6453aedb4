//! Sweep configuration.
//!
//! A [`TuningConfig`] fully describes one sweep: the measurement grid, the
//! per-cell work budget and the harness policy. Presets cover the usual
//! cases; any field can be overridden from a JSON file or the command line.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TuneError};

/// Total work per cell, shared between repetitions: the harness performs
/// `work_budget / (modulus_bitlen * exponent_bitlen)` exponentiations, which
/// keeps wall-clock time roughly constant across the grid.
pub const DEFAULT_WORK_BUDGET: u64 = 2_000_000_000;

/// Whether `max_block_width` itself is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepBound {
    /// Measure widths `1..max_block_width` (the historical tuner behavior:
    /// a configured 12 measures widths 1 to 11).
    #[default]
    Exclusive,
    /// Measure widths `1..=max_block_width`.
    Inclusive,
}

/// Configuration for a tuning sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    // =========================================================================
    // Grid
    // =========================================================================
    /// Modulus bit-lengths to measure.
    pub modulus_bitlens: Vec<usize>,

    /// Exponent bit-lengths to measure for every modulus. Need not be evenly
    /// spaced.
    pub exponent_bitlens: Vec<usize>,

    /// Largest block width of the sweep; see [`block_width_bound`](Self::block_width_bound).
    pub max_block_width: usize,

    /// Whether `max_block_width` is inclusive.
    pub block_width_bound: SweepBound,

    // =========================================================================
    // Harness policy
    // =========================================================================
    /// Work budget per cell. Default: [`DEFAULT_WORK_BUDGET`].
    pub work_budget: u64,

    /// Kill a harness invocation after this many seconds. Default: none.
    pub harness_timeout_secs: Option<f64>,

    /// Extra attempts for a failed cell before the sweep aborts. Default: 0.
    pub max_retries: usize,

    /// Harness invocations run concurrently. Default: 1.
    ///
    /// Values above 1 need the `parallel` feature. Concurrent invocations
    /// share CPU caches and can skew timings.
    pub jobs: usize,

    /// Fail instead of warn when the best block width decreases with a
    /// growing exponent bit-length. Default: false.
    pub strict_monotonicity: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl TuningConfig {
    /// Reference sweep: moduli 256 to 2048 (doublings), exponents from 100
    /// below twice the largest modulus in steps of 50, block widths 1 to 11.
    pub fn reference() -> Self {
        let modulus_bitlens: Vec<usize> = (0..4).map(|i| 256 << i).collect();
        let largest = modulus_bitlens.iter().copied().max().unwrap_or(256);
        Self {
            exponent_bitlens: (100..2 * largest).step_by(50).collect(),
            modulus_bitlens,
            max_block_width: 12,
            block_width_bound: SweepBound::Exclusive,
            work_budget: DEFAULT_WORK_BUDGET,
            harness_timeout_secs: None,
            max_retries: 0,
            jobs: 1,
            strict_monotonicity: false,
        }
    }

    /// Quick sweep for smoke-testing a harness: two moduli, exponents 100 to
    /// 1000, widths 1 to 8, a tenth of the work budget and a 60s timeout.
    pub fn quick() -> Self {
        Self {
            modulus_bitlens: vec![256, 512],
            exponent_bitlens: (100..1024).step_by(100).collect(),
            max_block_width: 8,
            block_width_bound: SweepBound::Inclusive,
            work_budget: DEFAULT_WORK_BUDGET / 10,
            harness_timeout_secs: Some(60.0),
            ..Self::reference()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "reference" | "default" => Some(Self::reference()),
            "quick" => Some(Self::quick()),
            _ => None,
        }
    }

    /// Load a configuration from a JSON file. Missing fields take the
    /// reference values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `start, start + step, ...` strictly below `end`.
    ///
    /// # Errors
    /// Returns [`TuneError::Config`] for a zero step.
    pub fn exponent_range(start: usize, end: usize, step: usize) -> Result<Vec<usize>> {
        if step == 0 {
            return Err(TuneError::Config(format!(
                "exponent range {start}:{end}:0 needs a positive step"
            )));
        }
        Ok((start..end).step_by(step).collect())
    }

    /// Largest block width actually measured.
    pub fn last_block_width(&self) -> usize {
        match self.block_width_bound {
            SweepBound::Exclusive => self.max_block_width.saturating_sub(1),
            SweepBound::Inclusive => self.max_block_width,
        }
    }

    /// Block widths measured for every (modulus, exponent) pair.
    pub fn block_widths(&self) -> RangeInclusive<usize> {
        1..=self.last_block_width()
    }

    /// Exponentiations per harness invocation; never below 1.
    pub fn sample_count(&self, modulus_bitlen: usize, exponent_bitlen: usize) -> u64 {
        let work = (modulus_bitlen as u64).saturating_mul(exponent_bitlen as u64);
        (self.work_budget / work.max(1)).max(1)
    }

    /// Harness timeout as a duration.
    pub fn harness_timeout(&self) -> Option<Duration> {
        self.harness_timeout_secs.map(Duration::from_secs_f64)
    }

    /// Number of (modulus, exponent) pairs.
    pub fn total_points(&self) -> usize {
        self.modulus_bitlens.len() * self.exponent_bitlens.len()
    }

    /// Number of harness invocations in a full sweep.
    pub fn total_cells(&self) -> usize {
        self.total_points() * self.last_block_width()
    }

    /// Check the configuration before a sweep starts.
    pub fn validate(&self) -> Result<()> {
        check_grid("modulus_bitlens", &self.modulus_bitlens)?;
        check_grid("exponent_bitlens", &self.exponent_bitlens)?;

        if self.last_block_width() == 0 {
            return Err(TuneError::Config(format!(
                "max_block_width {} ({:?}) measures no block width",
                self.max_block_width, self.block_width_bound
            )));
        }
        if self.work_budget == 0 {
            return Err(TuneError::Config("work_budget must be > 0".to_string()));
        }
        if self.jobs == 0 {
            return Err(TuneError::Config("jobs must be > 0".to_string()));
        }
        if let Some(secs) = self.harness_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(TuneError::Config(format!(
                    "harness_timeout_secs must be positive, got {secs}"
                )));
            }
        }
        Ok(())
    }
}

fn check_grid(name: &str, values: &[usize]) -> Result<()> {
    if values.is_empty() {
        return Err(TuneError::Config(format!("{name} must not be empty")));
    }
    if values.contains(&0) {
        return Err(TuneError::Config(format!("{name} must be positive")));
    }
    let mut seen = HashSet::new();
    for &v in values {
        if !seen.insert(v) {
            return Err(TuneError::Config(format!("{name} lists {v} twice")));
        }
    }
    Ok(())
}

/// Parse a comma-separated list of bit-lengths, e.g. `"256,512,1024"`.
pub fn parse_bitlens(s: &str) -> Result<Vec<usize>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| TuneError::Config(format!("'{}' is not a bit-length", v.trim())))
        })
        .collect()
}

/// Parse exponent bit-lengths given as a list or as `start:end:step`
/// (end exclusive).
pub fn parse_exponent_bitlens(s: &str) -> Result<Vec<usize>> {
    let parts: Vec<&str> = s.split(':').collect();
    match *parts.as_slice() {
        [start, end, step] => {
            let parse = |v: &str| {
                v.trim().parse::<usize>().map_err(|_| {
                    TuneError::Config(format!("'{}' is not a number in range '{}'", v.trim(), s))
                })
            };
            TuningConfig::exponent_range(parse(start)?, parse(end)?, parse(step)?)
        }
        [_] => parse_bitlens(s),
        _ => Err(TuneError::Config(format!(
            "expected a list or start:end:step, got '{}'",
            s
        ))),
    }
}
