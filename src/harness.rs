//! Timing harness adapters.
//!
//! The harness performs `sample_count` exponentiations for one grid cell and
//! reports the elapsed seconds. The [`Harness`] trait gives the sweep a single
//! interface over:
//!
//! - [`CommandHarness`]: the external `mpz_simexp_time` program
//! - [`SimulatedHarness`]: a deterministic cost model for dry runs
//! - [`FnHarness`]: any closure, mostly for tests

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Default external harness command.
pub const DEFAULT_COMMAND: &str = "./mpz_simexp_time";

/// How often a running harness is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One point of the measurement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Number of exponentiations performed by the harness.
    pub sample_count: u64,
    /// Modulus bit-length.
    pub modulus_bitlen: usize,
    /// Exponent bit-length.
    pub exponent_bitlen: usize,
    /// Block width (1-based).
    pub block_width: usize,
}

impl Cell {
    /// Create a grid cell.
    pub fn new(
        sample_count: u64,
        modulus_bitlen: usize,
        exponent_bitlen: usize,
        block_width: usize,
    ) -> Self {
        Self {
            sample_count,
            modulus_bitlen,
            exponent_bitlen,
            block_width,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mbl={} ebl={} bw={} (samples={})",
            self.modulus_bitlen, self.exponent_bitlen, self.block_width, self.sample_count
        )
    }
}

/// Common interface for timing harnesses.
pub trait Harness: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Measure one grid cell, returning elapsed seconds.
    fn measure(&self, cell: &Cell) -> Result<f64, HarnessError>;
}

/// Parse harness output as a non-negative number of seconds.
pub fn parse_seconds(output: &str) -> Result<f64, HarnessError> {
    let trimmed = output.trim();
    let value: f64 = trimmed.parse().map_err(|_| HarnessError::Parse {
        output: trimmed.to_string(),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(HarnessError::NonFinite { value });
    }
    Ok(value)
}

// =============================================================================
// External command
// =============================================================================

/// Runs the external timing program once per cell.
///
/// Invoked as `<command> -ps <samples> <modulus_bitlen> <exponent_bitlen> <block_width>`;
/// standard output must be a single floating-point number of seconds.
#[derive(Debug, Clone)]
pub struct CommandHarness {
    /// Program to run.
    pub command: PathBuf,
    /// Kill the program and fail the cell after this long.
    pub timeout: Option<Duration>,
}

impl Default for CommandHarness {
    fn default() -> Self {
        Self {
            command: PathBuf::from(DEFAULT_COMMAND),
            timeout: None,
        }
    }
}

impl CommandHarness {
    /// Create a harness for the given program.
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            timeout: None,
        }
    }

    /// Set the per-invocation timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_string(&self) -> String {
        self.command.display().to_string()
    }

    fn spawn(&self, cell: &Cell) -> Result<Child, HarnessError> {
        Command::new(&self.command)
            .arg("-ps")
            .arg(cell.sample_count.to_string())
            .arg(cell.modulus_bitlen.to_string())
            .arg(cell.exponent_bitlen.to_string())
            .arg(cell.block_width.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                command: self.command_string(),
                source,
            })
    }

    /// Wait for the child, killing it once `limit` has elapsed.
    fn wait_with_timeout(&self, child: &mut Child, limit: Duration) -> Result<ExitStatus, HarnessError> {
        let deadline = Instant::now() + limit;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    // The child may exit between try_wait and kill.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HarnessError::Timeout { after: limit });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(HarnessError::Spawn {
                        command: self.command_string(),
                        source,
                    })
                }
            }
        }
    }
}

impl Harness for CommandHarness {
    fn name(&self) -> &str {
        "command"
    }

    fn measure(&self, cell: &Cell) -> Result<f64, HarnessError> {
        let mut child = self.spawn(cell)?;

        let (status, stdout, stderr) = match self.timeout {
            Some(limit) => {
                // Both pipes are drained while polling, or a chatty harness
                // fills the pipe buffer and never exits.
                let stdout = child.stdout.take().map(drain);
                let stderr = child.stderr.take().map(drain);
                let status = self.wait_with_timeout(&mut child, limit)?;
                (status, join_reader(stdout), join_reader(stderr))
            }
            None => {
                let output = child.wait_with_output().map_err(|source| HarnessError::Spawn {
                    command: self.command_string(),
                    source,
                })?;
                (
                    output.status,
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                )
            }
        };

        if !status.success() {
            return Err(HarnessError::ExitStatus {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let seconds = parse_seconds(&stdout)?;
        tracing::debug!("{} -> {:.4}s", cell, seconds);
        Ok(seconds)
    }
}

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(reader: Option<JoinHandle<String>>) -> String {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

// =============================================================================
// Simulated cost model
// =============================================================================

/// Deterministic stand-in for the external harness.
///
/// Models a batch of simultaneous exponentiations as
/// `samples × (mbl / 64)² × ((2^w − w − 1) + ebl / w)` word multiplications,
/// each costing `ns_per_mul` nanoseconds. The optimum grows monotonically
/// with the exponent bit-length, so it yields clean threshold tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedHarness {
    /// Cost of one (64-bit limb)² multiplication step in nanoseconds.
    pub ns_per_mul: f64,
}

impl Default for SimulatedHarness {
    fn default() -> Self {
        Self { ns_per_mul: 2.0 }
    }
}

impl SimulatedHarness {
    /// Modelled elapsed seconds for a cell.
    pub fn model_seconds(&self, cell: &Cell) -> f64 {
        let limbs = cell.modulus_bitlen as f64 / 64.0;
        let width = cell.block_width as f64;
        let precomputation = (2f64).powf(width) - width - 1.0;
        let lookups = cell.exponent_bitlen as f64 / width;
        cell.sample_count as f64 * limbs * limbs * (precomputation + lookups) * self.ns_per_mul
            * 1e-9
    }
}

impl Harness for SimulatedHarness {
    fn name(&self) -> &str {
        "simulated"
    }

    fn measure(&self, cell: &Cell) -> Result<f64, HarnessError> {
        Ok(self.model_seconds(cell))
    }
}

// =============================================================================
// Closure adapter
// =============================================================================

/// Harness backed by a closure.
pub struct FnHarness<F> {
    name: String,
    f: F,
}

impl<F> FnHarness<F>
where
    F: Fn(&Cell) -> Result<f64, HarnessError> + Send + Sync,
{
    /// Wrap a closure as a harness.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Harness for FnHarness<F>
where
    F: Fn(&Cell) -> Result<f64, HarnessError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, cell: &Cell) -> Result<f64, HarnessError> {
        (self.f)(cell)
    }
}
