//! Measurement sweep orchestration.
//!
//! This module provides [`SweepRunner`], which enumerates the grid
//! (modulus → exponent → block width), measures every cell with a
//! [`Harness`], and aggregates the times into a [`TuningTable`].
//!
//! # Example
//!
//! ```ignore
//! use simexp_tune::{CommandHarness, SweepRunner, TuningConfig};
//!
//! let config = TuningConfig::quick();
//! let runner = SweepRunner::new(Box::new(CommandHarness::default()));
//! let table = runner.run(&config, |progress, task| {
//!     println!("{:.0}% - {}", progress * 100.0, task);
//! })?;
//!
//! println!("{}", table.modulus_bitlen_array("modulus_bitlens")?);
//! println!("{}", table.best_block_widths_thresholds("best_block_widths")?);
//! ```

use std::path::Path;
use std::sync::Arc;
#[cfg(feature = "parallel")]
use std::sync::mpsc;
#[cfg(feature = "parallel")]
use std::thread;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::checkpoint::IncrementalCsvWriter;
use crate::config::TuningConfig;
use crate::error::{HarnessError, Result, TuneError};
use crate::harness::{Cell, Harness};
use crate::tables::{BitlenTable, TimingVector, TuningTable};

/// Drives the harness over the configured grid.
pub struct SweepRunner {
    /// Harness measuring each cell
    harness: Box<dyn Harness>,
    /// Optional measurement log for resumable sweeps
    checkpoint: Option<Arc<IncrementalCsvWriter>>,
}

impl SweepRunner {
    /// Create a runner for the given harness.
    pub fn new(harness: Box<dyn Harness>) -> Self {
        Self {
            harness,
            checkpoint: None,
        }
    }

    /// Log every measurement to `checkpoint` and reuse the ones it holds.
    pub fn with_checkpoint(mut self, checkpoint: Arc<IncrementalCsvWriter>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Open (or resume) a measurement log at `path`.
    pub fn with_checkpoint_file(self, path: &Path, resume: bool) -> Result<Self> {
        let writer = IncrementalCsvWriter::new(path, resume).map_err(TuneError::Checkpoint)?;
        Ok(self.with_checkpoint(Arc::new(writer)))
    }

    /// Name of the harness in use.
    pub fn harness_name(&self) -> &str {
        self.harness.name()
    }

    /// Every grid cell in measurement order.
    pub fn cells(config: &TuningConfig) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(config.total_cells());
        for &mbl in &config.modulus_bitlens {
            for &ebl in &config.exponent_bitlens {
                let samples = config.sample_count(mbl, ebl);
                cells.extend(config.block_widths().map(|bw| Cell::new(samples, mbl, ebl, bw)));
            }
        }
        cells
    }

    /// Run the sweep.
    ///
    /// # Arguments
    /// * `config` - Sweep configuration (validated first)
    /// * `progress` - Callback receiving (progress_fraction, current_task)
    ///
    /// # Errors
    /// The first cell that still fails after `max_retries` aborts the sweep;
    /// so does a non-monotonic optimum when `strict_monotonicity` is set.
    pub fn run<F>(&self, config: &TuningConfig, progress: F) -> Result<TuningTable>
    where
        F: FnMut(f64, &str),
    {
        self.run_with(config, progress, |_, _| {})
    }

    /// Run the sweep, handing each modulus bit-length's table to
    /// `on_modulus` as soon as all of its cells are measured.
    ///
    /// Moduli are measured one after another in configuration order; with
    /// `jobs > 1` the cells of one modulus run concurrently.
    pub fn run_with<F, M>(
        &self,
        config: &TuningConfig,
        mut progress: F,
        mut on_modulus: M,
    ) -> Result<TuningTable>
    where
        F: FnMut(f64, &str),
        M: FnMut(usize, &BitlenTable),
    {
        config.validate()?;

        let start = Instant::now();
        let cells = Self::cells(config);
        tracing::info!(
            "Sweeping {} cells ({} moduli x {} exponents x {} widths) with the {} harness",
            cells.len(),
            config.modulus_bitlens.len(),
            config.exponent_bitlens.len(),
            config.last_block_width(),
            self.harness.name()
        );

        #[cfg(feature = "parallel")]
        let pool = self.worker_pool(config)?;
        #[cfg(not(feature = "parallel"))]
        if config.jobs > 1 {
            tracing::warn!(
                "jobs={} requested but the `parallel` feature is disabled; measuring sequentially",
                config.jobs
            );
        }

        progress(0.0, "Starting sweep...");
        let mut tracker = Progress {
            done: 0,
            total: cells.len(),
            callback: &mut progress,
        };
        let per_modulus = config.exponent_bitlens.len() * config.last_block_width();
        let mut table = TuningTable::new();

        for (&mbl, batch) in config
            .modulus_bitlens
            .iter()
            .zip(cells.chunks(per_modulus))
        {
            #[cfg(feature = "parallel")]
            let times = match &pool {
                Some(pool) => self.measure_parallel(pool, config, batch, &mut tracker)?,
                None => self.measure_sequential(config, batch, &mut tracker)?,
            };
            #[cfg(not(feature = "parallel"))]
            let times = self.measure_sequential(config, batch, &mut tracker)?;

            let bitlens = Self::aggregate(config, mbl, &times)?;
            on_modulus(mbl, &bitlens);
            table.add(mbl, bitlens)?;
        }
        self.check_monotonicity(config, &table)?;

        progress(1.0, "Complete");
        tracing::info!("Sweep finished in {:.1}s", start.elapsed().as_secs_f64());
        Ok(table)
    }

    fn measure_sequential<F>(
        &self,
        config: &TuningConfig,
        cells: &[Cell],
        tracker: &mut Progress<'_, F>,
    ) -> Result<Vec<f64>>
    where
        F: FnMut(f64, &str),
    {
        let mut times = Vec::with_capacity(cells.len());
        for cell in cells {
            times.push(self.measure_cell(cell, config.max_retries)?);
            tracker.completed(cell);
        }
        Ok(times)
    }

    #[cfg(feature = "parallel")]
    fn worker_pool(&self, config: &TuningConfig) -> Result<Option<rayon::ThreadPool>> {
        if config.jobs <= 1 {
            return Ok(None);
        }
        tracing::warn!(
            "Measuring with {} concurrent harness invocations; shared caches and cores can skew timings",
            config.jobs
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map(Some)
            .map_err(|e| TuneError::Config(format!("cannot start {} workers: {}", config.jobs, e)))
    }

    /// Measure `cells` on the pool while this thread reports progress.
    #[cfg(feature = "parallel")]
    fn measure_parallel<F>(
        &self,
        pool: &rayon::ThreadPool,
        config: &TuningConfig,
        cells: &[Cell],
        tracker: &mut Progress<'_, F>,
    ) -> Result<Vec<f64>>
    where
        F: FnMut(f64, &str),
    {
        let (tx, rx) = mpsc::channel::<Cell>();
        thread::scope(|scope| {
            let workers = scope.spawn(move || {
                // Collecting keeps grid order regardless of completion order.
                pool.install(|| {
                    cells
                        .par_iter()
                        .map_with(tx, |tx, cell| -> Result<f64> {
                            let seconds = self.measure_cell(cell, config.max_retries)?;
                            let _ = tx.send(*cell);
                            Ok(seconds)
                        })
                        .collect::<Result<Vec<f64>>>()
                })
            });
            // Ends once every sender clone is dropped with the workers.
            for cell in rx {
                tracker.completed(&cell);
            }
            workers
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        })
    }

    /// Measure one cell, reusing a logged result and retrying failures.
    fn measure_cell(&self, cell: &Cell, max_retries: usize) -> Result<f64> {
        if let Some(seconds) = self.checkpoint.as_ref().and_then(|cp| cp.lookup(cell)) {
            tracing::debug!("{} -> {:.4}s (from checkpoint)", cell, seconds);
            return Ok(seconds);
        }

        let mut attempt = 0;
        loop {
            let result = self.harness.measure(cell).and_then(|seconds| {
                if seconds.is_finite() && seconds >= 0.0 {
                    Ok(seconds)
                } else {
                    Err(HarnessError::NonFinite { value: seconds })
                }
            });

            match result {
                Ok(seconds) => {
                    if let Some(ref writer) = self.checkpoint {
                        if let Err(e) = writer.write_measurement(cell, seconds) {
                            tracing::warn!("Failed to write checkpoint: {}", e);
                        }
                    }
                    return Ok(seconds);
                }
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} failed ({}); retry {}/{}",
                        cell,
                        e,
                        attempt,
                        max_retries
                    );
                }
                Err(source) => {
                    return Err(TuneError::Harness {
                        cell: *cell,
                        source,
                    })
                }
            }
        }
    }

    /// Fold one modulus' times (in [`cells`](Self::cells) order) into its table.
    fn aggregate(config: &TuningConfig, modulus_bitlen: usize, times: &[f64]) -> Result<BitlenTable> {
        let mut chunks = times.chunks(config.last_block_width());
        let mut bitlens = BitlenTable::new(modulus_bitlen);
        for &ebl in &config.exponent_bitlens {
            let chunk = chunks.next().ok_or(TuneError::EmptyTimingVector)?;
            bitlens.add(ebl, TimingVector::from_times(chunk.iter().copied())?)?;
        }

        let bests = bitlens.best_block_widths()?;
        tracing::info!(
            "mbl={}: best widths {}",
            modulus_bitlen,
            bests
                .iter()
                .map(|(ebl, bw)| format!("{ebl}:{bw}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(bitlens)
    }

    fn check_monotonicity(&self, config: &TuningConfig, table: &TuningTable) -> Result<()> {
        for (modulus_bitlen, violations) in table.monotonicity_violations()? {
            if config.strict_monotonicity {
                return Err(TuneError::NonMonotonic {
                    modulus_bitlen,
                    violations,
                });
            }
            for v in &violations {
                tracing::warn!(
                    "mbl={}: best block width decreases at {}; threshold row skips this dip",
                    modulus_bitlen,
                    v
                );
            }
        }
        Ok(())
    }
}

/// Completed-cell counter feeding the progress callback.
struct Progress<'a, F> {
    done: usize,
    total: usize,
    callback: &'a mut F,
}

impl<F: FnMut(f64, &str)> Progress<'_, F> {
    fn completed(&mut self, cell: &Cell) {
        self.done += 1;
        (self.callback)(
            self.done as f64 / self.total.max(1) as f64,
            &format!(
                "mbl={} ebl={} bw={}",
                cell.modulus_bitlen, cell.exponent_bitlen, cell.block_width
            ),
        );
    }
}
