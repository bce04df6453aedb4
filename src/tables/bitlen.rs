//! Per-modulus table: exponent bit-length to timing vector.
//!
//! The central derivation lives here. [`BitlenTable::thresholds`] collapses
//! the per-exponent optimum into a staircase: position `i` of the row holds
//! the smallest exponent bit-length at which block width `i + 1` is reached,
//! and `0` once no measured exponent reaches that width.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::TimingVector;
use crate::error::{Result, TuneError};

/// A step where the best block width shrinks as the exponent grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonotonicityViolation {
    /// Smaller exponent bit-length of the pair.
    pub previous_exponent_bitlen: usize,
    /// Best block width at `previous_exponent_bitlen`.
    pub previous_width: usize,
    /// Larger exponent bit-length of the pair.
    pub exponent_bitlen: usize,
    /// Best block width at `exponent_bitlen` (smaller than `previous_width`).
    pub width: usize,
}

impl fmt::Display for MonotonicityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ebl {} -> {} (width {} -> {})",
            self.previous_exponent_bitlen, self.exponent_bitlen, self.previous_width, self.width
        )
    }
}

/// Timing vectors for every exponent bit-length measured at one modulus
/// bit-length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitlenTable {
    modulus_bitlen: usize,
    entries: BTreeMap<usize, TimingVector>,
}

impl BitlenTable {
    /// Create an empty table for the given modulus bit-length.
    pub fn new(modulus_bitlen: usize) -> Self {
        Self {
            modulus_bitlen,
            entries: BTreeMap::new(),
        }
    }

    /// Modulus bit-length this table was measured for.
    pub fn modulus_bitlen(&self) -> usize {
        self.modulus_bitlen
    }

    /// Register the results for one exponent bit-length.
    ///
    /// # Errors
    /// - [`TuneError::DuplicateExponentBitlen`] if the key is already present
    /// - [`TuneError::EmptyTimingVector`] if `timings` holds no measurement
    pub fn add(&mut self, exponent_bitlen: usize, timings: TimingVector) -> Result<()> {
        if timings.is_empty() {
            return Err(TuneError::EmptyTimingVector);
        }
        if self.entries.contains_key(&exponent_bitlen) {
            return Err(TuneError::DuplicateExponentBitlen {
                modulus_bitlen: self.modulus_bitlen,
                exponent_bitlen,
            });
        }
        self.entries.insert(exponent_bitlen, timings);
        Ok(())
    }

    /// Number of exponent bit-lengths registered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no exponent bit-length has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Timing vector for one exponent bit-length.
    pub fn get(&self, exponent_bitlen: usize) -> Option<&TimingVector> {
        self.entries.get(&exponent_bitlen)
    }

    /// Entries in ascending exponent bit-length order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TimingVector)> + '_ {
        self.entries.iter().map(|(&ebl, v)| (ebl, v))
    }

    /// Longest timing vector in the table (0 when empty).
    pub fn max_block_width(&self) -> usize {
        self.entries.values().map(TimingVector::len).max().unwrap_or(0)
    }

    /// Best block width for every exponent bit-length, ascending.
    pub fn best_block_widths(&self) -> Result<Vec<(usize, usize)>> {
        self.iter()
            .map(|(ebl, v)| Ok((ebl, v.best_block_width()?)))
            .collect()
    }

    /// Derive the threshold row for this modulus bit-length.
    ///
    /// Walks the exponent bit-lengths in ascending order with a block-width
    /// floor starting at 1. Each key is emitted once for every floor its best
    /// width reaches, so a jump of several widths repeats the key. Remaining
    /// positions up to `columns` are padded with `0`.
    ///
    /// Monotonicity of the optimum is assumed here; see
    /// [`monotonicity_violations`](Self::monotonicity_violations).
    ///
    /// # Errors
    /// - [`TuneError::EmptyBitlenTable`] if nothing was registered
    /// - [`TuneError::RowOverflow`] if the staircase needs more than `columns`
    pub fn thresholds(&self, columns: usize) -> Result<Vec<usize>> {
        if self.entries.is_empty() {
            return Err(TuneError::EmptyBitlenTable {
                modulus_bitlen: self.modulus_bitlen,
            });
        }

        let mut row = Vec::with_capacity(columns);
        let mut floor = 1;
        for (ebl, timings) in self.iter() {
            let best = timings.best_block_width()?;
            while best >= floor {
                row.push(ebl);
                floor += 1;
            }
        }

        if row.len() > columns {
            return Err(TuneError::RowOverflow {
                modulus_bitlen: self.modulus_bitlen,
                needed: row.len(),
                columns,
            });
        }
        row.resize(columns, 0);
        Ok(row)
    }

    /// Consecutive exponent bit-lengths where the best block width decreases.
    ///
    /// The threshold staircase silently skips over such steps, so callers
    /// should report them before trusting the emitted row.
    pub fn monotonicity_violations(&self) -> Result<Vec<MonotonicityViolation>> {
        let bests = self.best_block_widths()?;
        Ok(bests
            .windows(2)
            .filter(|pair| pair[1].1 < pair[0].1)
            .map(|pair| MonotonicityViolation {
                previous_exponent_bitlen: pair[0].0,
                previous_width: pair[0].1,
                exponent_bitlen: pair[1].0,
                width: pair[1].1,
            })
            .collect())
    }
}
