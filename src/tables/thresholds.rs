//! Derived threshold table shared by both emitted artifacts.

use serde::{Deserialize, Serialize};

/// Threshold row for one modulus bit-length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRow {
    /// Modulus bit-length the row applies to.
    pub modulus_bitlen: usize,
    /// `thresholds[i]` is the smallest exponent bit-length selecting block
    /// width `i + 1`, or `0` if that width is never selected.
    pub thresholds: Vec<usize>,
}

/// Rectangular table of threshold rows in ascending modulus order.
///
/// The modulus array and the 2-D threshold array are both rendered from this
/// one ordered sequence, so row `i` always belongs to modulus `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdTable {
    columns: usize,
    rows: Vec<ThresholdRow>,
}

impl ThresholdTable {
    /// Assemble a table from rows already sorted by modulus bit-length and
    /// padded to `columns`.
    pub(crate) fn new(columns: usize, rows: Vec<ThresholdRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.thresholds.len() == columns));
        debug_assert!(rows
            .windows(2)
            .all(|w| w[0].modulus_bitlen < w[1].modulus_bitlen));
        Self { columns, rows }
    }

    /// Shared row length (the largest number of block widths measured).
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Rows in ascending modulus order.
    pub fn rows(&self) -> &[ThresholdRow] {
        &self.rows
    }

    /// Modulus bit-lengths in row order.
    pub fn modulus_bitlens(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.modulus_bitlen).collect()
    }

    /// Row for an exact modulus bit-length.
    pub fn row(&self, modulus_bitlen: usize) -> Option<&ThresholdRow> {
        self.rows.iter().find(|r| r.modulus_bitlen == modulus_bitlen)
    }
}
