//! JSON export of a tuning run.

use serde::Serialize;

use crate::error::Result;
use crate::tables::{ThresholdTable, TuningTable};

/// Everything a run produced: the derived thresholds and the raw timings.
#[derive(Serialize)]
struct Report<'a> {
    thresholds: ThresholdTable,
    measurements: &'a TuningTable,
}

impl<'a> Report<'a> {
    fn new(table: &'a TuningTable) -> Result<Self> {
        Ok(Self {
            thresholds: table.thresholds()?,
            measurements: table,
        })
    }
}

/// Serialize a tuning run to a compact JSON string.
///
/// # Errors
///
/// Fails when the table is empty (no thresholds can be derived).
pub fn to_json(table: &TuningTable) -> Result<String> {
    Ok(serde_json::to_string(&Report::new(table)?)?)
}

/// Serialize a tuning run to a pretty-printed JSON string.
///
/// # Errors
///
/// Fails when the table is empty (no thresholds can be derived).
pub fn to_json_pretty(table: &TuningTable) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Report::new(table)?)?)
}
