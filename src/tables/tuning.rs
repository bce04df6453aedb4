//! Top-level tuning result: modulus bit-length to [`BitlenTable`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BitlenTable, MonotonicityViolation, ThresholdRow, ThresholdTable};
use crate::error::{Result, TuneError};
use crate::output::c_array;

/// All measurements of a sweep, keyed by modulus bit-length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningTable {
    moduli: BTreeMap<usize, BitlenTable>,
}

impl TuningTable {
    /// Create an empty tuning table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the results for one modulus bit-length.
    ///
    /// # Errors
    /// - [`TuneError::DuplicateModulusBitlen`] if the key is already present
    /// - [`TuneError::EmptyBitlenTable`] if `table` holds no exponent bit-length
    /// - [`TuneError::Config`] if `table` was built for another modulus
    pub fn add(&mut self, modulus_bitlen: usize, table: BitlenTable) -> Result<()> {
        if table.modulus_bitlen() != modulus_bitlen {
            return Err(TuneError::Config(format!(
                "table measured for modulus bit-length {} registered as {}",
                table.modulus_bitlen(),
                modulus_bitlen
            )));
        }
        if table.is_empty() {
            return Err(TuneError::EmptyBitlenTable { modulus_bitlen });
        }
        if self.moduli.contains_key(&modulus_bitlen) {
            return Err(TuneError::DuplicateModulusBitlen { modulus_bitlen });
        }
        self.moduli.insert(modulus_bitlen, table);
        Ok(())
    }

    /// Number of modulus bit-lengths registered.
    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }

    /// Table for one modulus bit-length.
    pub fn get(&self, modulus_bitlen: usize) -> Option<&BitlenTable> {
        self.moduli.get(&modulus_bitlen)
    }

    /// Tables in ascending modulus order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BitlenTable)> + '_ {
        self.moduli.iter().map(|(&mbl, t)| (mbl, t))
    }

    /// Registered modulus bit-lengths, ascending.
    pub fn modulus_bitlens(&self) -> Vec<usize> {
        self.moduli.keys().copied().collect()
    }

    /// Shared column count: the longest timing vector anywhere in the table.
    pub fn max_block_width(&self) -> usize {
        self.moduli
            .values()
            .map(BitlenTable::max_block_width)
            .max()
            .unwrap_or(0)
    }

    /// Derive every threshold row with the shared column count.
    ///
    /// # Errors
    /// Returns [`TuneError::EmptyTuningTable`] when nothing was registered, or
    /// any error from [`BitlenTable::thresholds`].
    pub fn thresholds(&self) -> Result<ThresholdTable> {
        if self.moduli.is_empty() {
            return Err(TuneError::EmptyTuningTable);
        }
        let columns = self.max_block_width();
        let rows = self
            .iter()
            .map(|(modulus_bitlen, table)| {
                Ok(ThresholdRow {
                    modulus_bitlen,
                    thresholds: table.thresholds(columns)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ThresholdTable::new(columns, rows))
    }

    /// Render the sorted modulus bit-lengths as `int name[R] = {...};`.
    pub fn modulus_bitlen_array(&self, name: &str) -> Result<String> {
        Ok(c_array::modulus_array(&self.thresholds()?, name))
    }

    /// Render the threshold rows as `int name[R][C] = {...};`.
    pub fn best_block_widths_thresholds(&self, name: &str) -> Result<String> {
        Ok(c_array::threshold_array(&self.thresholds()?, name))
    }

    /// Non-monotonic optima per modulus bit-length (only rows that have any).
    pub fn monotonicity_violations(&self) -> Result<Vec<(usize, Vec<MonotonicityViolation>)>> {
        let mut report = Vec::new();
        for (modulus_bitlen, table) in self.iter() {
            let violations = table.monotonicity_violations()?;
            if !violations.is_empty() {
                report.push((modulus_bitlen, violations));
            }
        }
        Ok(report)
    }
}
