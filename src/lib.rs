//! # simexp-tune
//!
//! Offline auto-tuner for the block width of simultaneous modular
//! exponentiation.
//!
//! The tuner times an external harness over a grid of modulus bit-lengths,
//! exponent bit-lengths and block widths, finds the fastest block width for
//! every (modulus, exponent) pair, and compresses the result into a
//! threshold table the exponentiation library looks up at runtime:
//! - `modulus_bitlens[R]`: the tabulated modulus bit-lengths, ascending
//! - `best_block_widths[R][C]`: per modulus, the smallest exponent
//!   bit-length at which each block width becomes optimal (`0` if never)
//!
//! ## Quick Start
//!
//! ```ignore
//! use simexp_tune::{CommandHarness, SweepRunner, TuningConfig};
//!
//! let config = TuningConfig::reference();
//! let harness = CommandHarness::new("./mpz_simexp_time").timeout(config.harness_timeout());
//! let table = SweepRunner::new(Box::new(harness)).run(&config, |_, _| {})?;
//!
//! println!("{}", table.modulus_bitlen_array("modulus_bitlens")?);
//! println!("{}", table.best_block_widths_thresholds("best_block_widths")?);
//! ```
//!
//! ## Reading a table back
//!
//! ```ignore
//! let thresholds = table.thresholds()?;
//! // Width the library picks for a 1024-bit modulus and 700-bit exponents.
//! let width = thresholds.select_block_width(1024, 700);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod error;

// Functional modules
pub mod checkpoint;
pub mod config;
pub mod dispatch;
pub mod harness;
pub mod output;
pub mod sweep;
pub mod tables;

// Re-exports for public API
pub use checkpoint::IncrementalCsvWriter;
pub use config::{SweepBound, TuningConfig, DEFAULT_WORK_BUDGET};
pub use dispatch::theoretical_block_width;
pub use error::{HarnessError, Result, TuneError};
pub use harness::{Cell, CommandHarness, FnHarness, Harness, SimulatedHarness};
pub use output::{write_artifact, Artifact, ArtifactFormat};
pub use sweep::SweepRunner;
pub use tables::{
    BitlenTable, MonotonicityViolation, ThresholdRow, ThresholdTable, TimingVector, TuningTable,
};
