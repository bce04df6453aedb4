//! Aggregation of sweep measurements and threshold derivation.
//!
//! Three layers, leaves first:
//!
//! - [`TimingVector`]: times for one (modulus, exponent) pair, one per block width
//! - [`BitlenTable`]: exponent bit-length to timing vector, for one modulus
//! - [`TuningTable`]: modulus bit-length to bit-length table
//!
//! All three are append-only while the sweep runs and read-only afterwards.
//! [`TuningTable::thresholds`] produces the [`ThresholdTable`] from which both
//! output arrays are rendered.

mod bitlen;
mod thresholds;
mod tuning;
mod vector;

pub use bitlen::{BitlenTable, MonotonicityViolation};
pub use thresholds::{ThresholdRow, ThresholdTable};
pub use tuning::TuningTable;
pub use vector::{TimingVector, DISPLAY_TOLERANCE_SECS};
