//! Runtime block-width selection from a threshold table.
//!
//! This is the lookup the exponentiation library performs with the emitted
//! arrays. Having it here lets the tuner check that a table selects the
//! widths that were actually measured as optimal.

use crate::error::Result;
use crate::tables::{ThresholdRow, ThresholdTable, TuningTable};

/// Upper bound on the width tried by [`theoretical_block_width`].
const MAX_THEORETICAL_WIDTH: usize = 50;

impl ThresholdTable {
    /// Row used for a modulus of the given bit-length.
    ///
    /// Picks the largest tabulated modulus not exceeding `modulus_bitlen`,
    /// falling back to the smallest row for moduli below every entry.
    pub fn row_for_modulus(&self, modulus_bitlen: usize) -> Option<&ThresholdRow> {
        self.rows()
            .iter()
            .rev()
            .find(|r| r.modulus_bitlen <= modulus_bitlen)
            .or_else(|| self.rows().first())
    }

    /// Block width the runtime dispatch would select.
    ///
    /// Returns 1 when no row exists or no threshold is reached.
    pub fn select_block_width(&self, modulus_bitlen: usize, exponent_bitlen: usize) -> usize {
        self.row_for_modulus(modulus_bitlen)
            .map(|row| row.select_block_width(exponent_bitlen))
            .unwrap_or(1)
    }
}

impl ThresholdRow {
    /// Largest block width whose threshold is reached by `exponent_bitlen`.
    ///
    /// Zero entries are unreachable sentinels. Returns 1 if no threshold is
    /// reached.
    pub fn select_block_width(&self, exponent_bitlen: usize) -> usize {
        self.thresholds
            .iter()
            .rposition(|&t| t != 0 && t <= exponent_bitlen)
            .map_or(1, |i| i + 1)
    }
}

/// A measured point where the table selects a different width than the
/// fastest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disagreement {
    /// Modulus bit-length of the point.
    pub modulus_bitlen: usize,
    /// Exponent bit-length of the point.
    pub exponent_bitlen: usize,
    /// Fastest measured width.
    pub measured: usize,
    /// Width the lookup selects.
    pub selected: usize,
}

/// Replay the lookup over every measured point of `table`.
///
/// The staircase only rises, so every point past a dip in the optimum shows
/// up here; a monotonic sweep yields none.
pub fn disagreements(table: &TuningTable) -> Result<Vec<Disagreement>> {
    let thresholds = table.thresholds()?;
    let mut found = Vec::new();
    for (modulus_bitlen, bitlens) in table.iter() {
        for (exponent_bitlen, timings) in bitlens.iter() {
            let measured = timings.best_block_width()?;
            let selected = thresholds.select_block_width(modulus_bitlen, exponent_bitlen);
            if measured != selected {
                found.push(Disagreement {
                    modulus_bitlen,
                    exponent_bitlen,
                    measured,
                    selected,
                });
            }
        }
    }
    Ok(found)
}

/// Analytic block-width estimate for a given exponent bit-length.
///
/// Minimizes `2^w - w - 1` precomputation products plus `e / w` table
/// lookups. Real optima differ from this, which is why the tuner measures;
/// the estimate is shown next to measured results for comparison.
pub fn theoretical_block_width(exponent_bitlen: usize) -> usize {
    let mut best_width = 1;
    let mut best_cost = exponent_bitlen;

    for width in 2..MAX_THEORETICAL_WIDTH {
        let cost = (1usize << width) - width - 1 + exponent_bitlen / width;
        if cost > best_cost {
            break;
        }
        best_cost = cost;
        best_width = width;
    }
    best_width
}
