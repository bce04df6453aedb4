//! Error types for the tuning sweep.
//!
//! Every failure aborts the sweep: the emitted tables must be rectangular and
//! complete to be usable, so there is no degraded output mode.

use std::io;
use std::time::Duration;

use crate::harness::Cell;
use crate::tables::MonotonicityViolation;

/// Error returned when a single harness invocation fails.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The harness process could not be started.
    #[error("failed to start harness `{command}`: {source}")]
    Spawn {
        /// Command that was executed.
        command: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The harness exited with a non-zero status.
    #[error("harness exited with {status}: {stderr}")]
    ExitStatus {
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error (trimmed).
        stderr: String,
    },

    /// The harness output was not a floating-point number.
    #[error("harness output is not a number of seconds: {output:?}")]
    Parse {
        /// Raw (trimmed) standard output.
        output: String,
    },

    /// The harness did not finish within the configured timeout and was killed.
    #[error("harness timed out after {after:?}")]
    Timeout {
        /// Configured timeout.
        after: Duration,
    },

    /// The harness reported a NaN, infinite or negative time.
    #[error("harness reported an invalid time: {value}")]
    NonFinite {
        /// Reported value.
        value: f64,
    },
}

/// Errors that can occur while building or deriving tuning tables.
#[derive(Debug, thiserror::Error)]
pub enum TuneError {
    /// A grid cell could not be measured (after all retries).
    #[error("measurement failed for {cell}: {source}")]
    Harness {
        /// The failing grid cell.
        cell: Cell,
        /// The last harness error.
        #[source]
        source: HarnessError,
    },

    /// The same exponent bit-length was registered twice for one modulus.
    #[error("exponent bit-length {exponent_bitlen} already registered for modulus bit-length {modulus_bitlen}")]
    DuplicateExponentBitlen {
        /// Modulus bit-length of the table.
        modulus_bitlen: usize,
        /// Duplicated key.
        exponent_bitlen: usize,
    },

    /// The same modulus bit-length was registered twice.
    #[error("modulus bit-length {modulus_bitlen} already registered")]
    DuplicateModulusBitlen {
        /// Duplicated key.
        modulus_bitlen: usize,
    },

    /// Best block width requested from a vector with no measurements.
    #[error("timing vector is empty")]
    EmptyTimingVector,

    /// Thresholds requested from a table with no exponent bit-lengths.
    #[error("no exponent bit-lengths measured for modulus bit-length {modulus_bitlen}")]
    EmptyBitlenTable {
        /// Modulus bit-length of the empty table.
        modulus_bitlen: usize,
    },

    /// A threshold row needs more columns than were requested.
    #[error("threshold row for modulus bit-length {modulus_bitlen} needs {needed} columns, only {columns} available")]
    RowOverflow {
        /// Modulus bit-length of the row.
        modulus_bitlen: usize,
        /// Columns the row would occupy.
        needed: usize,
        /// Columns requested.
        columns: usize,
    },

    /// Artifacts requested from a tuning table with no moduli.
    #[error("tuning table has no modulus bit-lengths")]
    EmptyTuningTable,

    /// A non-finite or negative time was offered to a timing vector.
    #[error("invalid elapsed time {time}: must be finite and non-negative")]
    InvalidTime {
        /// Rejected value.
        time: f64,
    },

    /// Best block width decreases with growing exponent bit-length.
    #[error("best block width is not monotonic for modulus bit-length {modulus_bitlen}: {}", format_violations(.violations))]
    NonMonotonic {
        /// Modulus bit-length of the offending row.
        modulus_bitlen: usize,
        /// Every decreasing step observed.
        violations: Vec<MonotonicityViolation>,
    },

    /// Invalid sweep configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Checkpoint log could not be read or written.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[source] io::Error),

    /// IO error while writing artifacts or reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_violations(violations: &[MonotonicityViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for tuning operations.
pub type Result<T> = std::result::Result<T, TuneError>;
