//! Incremental measurement log for resumable sweeps.
//!
//! Every measured cell is appended to a CSV file and flushed immediately, so
//! an interrupted sweep can be resumed without re-measuring completed cells.
//!
//! # Example
//!
//! ```ignore
//! use simexp_tune::checkpoint::IncrementalCsvWriter;
//! use std::path::Path;
//!
//! // resume=true loads existing measurements
//! let writer = IncrementalCsvWriter::new(Path::new("measurements.csv"), true)?;
//!
//! if writer.lookup(&cell).is_none() {
//!     let seconds = harness.measure(&cell)?;
//!     writer.write_measurement(&cell, seconds)?;
//! }
//! ```

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::harness::Cell;

/// CSV header of the measurement log.
pub const CSV_HEADER: &str = "modulus_bitlen,exponent_bitlen,block_width,sample_count,seconds";

/// Grid position of a measurement, independent of its sample count.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct CellKey {
    /// Modulus bit-length.
    pub modulus_bitlen: usize,
    /// Exponent bit-length.
    pub exponent_bitlen: usize,
    /// Block width (1-based).
    pub block_width: usize,
}

impl From<&Cell> for CellKey {
    fn from(cell: &Cell) -> Self {
        Self {
            modulus_bitlen: cell.modulus_bitlen,
            exponent_bitlen: cell.exponent_bitlen,
            block_width: cell.block_width,
        }
    }
}

/// A logged measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Logged {
    sample_count: u64,
    seconds: f64,
}

/// Thread-safe incremental CSV writer with resume support.
pub struct IncrementalCsvWriter {
    /// Buffered file writer protected by mutex for concurrent sweeps.
    file: Mutex<BufWriter<File>>,
    /// Completed measurements by grid position.
    completed: Mutex<HashMap<CellKey, Logged>>,
    /// Number of measurements loaded from an existing log.
    pub resumed_count: usize,
}

impl IncrementalCsvWriter {
    /// Open a measurement log.
    ///
    /// - `resume=false`: create the file (truncating it) and write the header
    /// - `resume=true` and the file exists: load its rows and append
    /// - `resume=true` and no file: same as `resume=false`
    pub fn new(path: &Path, resume: bool) -> io::Result<Self> {
        let (file, completed) = if resume && path.exists() {
            let completed = Self::load_completed(path)?;
            let file = OpenOptions::new().append(true).open(path)?;
            (file, completed)
        } else {
            let mut file = File::create(path)?;
            writeln!(file, "{}", CSV_HEADER)?;
            file.flush()?;
            (file, HashMap::new())
        };

        let resumed_count = completed.len();
        if resumed_count > 0 {
            tracing::info!(
                "Loaded {} measurements from {}",
                resumed_count,
                path.display()
            );
        }

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            completed: Mutex::new(completed),
            resumed_count,
        })
    }

    /// Previously logged time for `cell`.
    ///
    /// Rows measured with a different sample count (e.g. another work
    /// budget) are ignored so the cell is measured again.
    pub fn lookup(&self, cell: &Cell) -> Option<f64> {
        let completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        match completed.get(&CellKey::from(cell)) {
            Some(logged) if logged.sample_count == cell.sample_count => Some(logged.seconds),
            Some(logged) => {
                tracing::warn!(
                    "Ignoring logged {}: measured with {} samples, sweep uses {}",
                    cell,
                    logged.sample_count,
                    cell.sample_count
                );
                None
            }
            None => None,
        }
    }

    /// Number of measurements known to the log.
    pub fn completed_count(&self) -> usize {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Append one measurement and flush it to disk.
    pub fn write_measurement(&self, cell: &Cell, seconds: f64) -> io::Result<()> {
        {
            let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
            writeln!(
                file,
                "{},{},{},{},{}",
                cell.modulus_bitlen,
                cell.exponent_bitlen,
                cell.block_width,
                cell.sample_count,
                seconds
            )?;
            file.flush()?;
        }

        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                CellKey::from(cell),
                Logged {
                    sample_count: cell.sample_count,
                    seconds,
                },
            );
        Ok(())
    }

    /// Load logged measurements; later rows for the same cell win.
    fn load_completed(path: &Path) -> io::Result<HashMap<CellKey, Logged>> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut completed = HashMap::new();
        let mut buf = Vec::new();
        let mut line_num = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_num += 1;
            let Ok(line) = std::str::from_utf8(&buf) else {
                tracing::warn!("Skipping non-UTF-8 line {} in checkpoint", line_num);
                continue;
            };
            let line = line.trim();

            if line.is_empty() || (line_num == 1 && line == CSV_HEADER) {
                continue;
            }

            match Self::parse_csv_row(line) {
                Some((key, logged)) => {
                    completed.insert(key, logged);
                }
                None => tracing::warn!(
                    "Skipping malformed line {} in checkpoint: {}",
                    line_num,
                    line.chars().take(80).collect::<String>()
                ),
            }
        }

        Ok(completed)
    }

    fn parse_csv_row(line: &str) -> Option<(CellKey, Logged)> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 5 {
            return None;
        }
        let key = CellKey {
            modulus_bitlen: parts[0].parse().ok()?,
            exponent_bitlen: parts[1].parse().ok()?,
            block_width: parts[2].parse().ok()?,
        };
        let seconds: f64 = parts[4].parse().ok()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        let logged = Logged {
            sample_count: parts[3].parse().ok()?,
            seconds,
        };
        Some((key, logged))
    }
}
