//! Rendering of tuning results.
//!
//! This module provides formatters for a finished [`TuningTable`]:
//! - C arrays: the two tables the exponentiation library compiles in
//! - Rust consts: the same tables for Rust consumers
//! - Terminal: per-modulus timing tables with the apparent minima starred
//! - JSON: machine-readable export of every measurement and threshold

pub mod c_array;
mod json;
mod terminal;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use json::{to_json, to_json_pretty};
pub use terminal::{format_bitlen_table, format_modulus_table};

use crate::error::Result;
use crate::tables::TuningTable;

/// Symbol of the modulus bit-length array.
pub const MODULUS_ARRAY_NAME: &str = "modulus_bitlens";

/// Symbol of the threshold array.
pub const THRESHOLD_ARRAY_NAME: &str = "best_block_widths";

/// Artifact flavour written by the tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// C array definitions (`simexp_thresholds.h`).
    C,
    /// Rust `const` items (`simexp_thresholds.rs`).
    Rust,
    /// Full JSON export (`simexp_tuning.json`).
    Json,
}

impl ArtifactFormat {
    /// Parse a format name as given on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "c" => Some(Self::C),
            "rust" | "rs" => Some(Self::Rust),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// File name of the artifact.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::C => "simexp_thresholds.h",
            Self::Rust => "simexp_thresholds.rs",
            Self::Json => "simexp_tuning.json",
        }
    }
}

/// A rendered file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Destination file.
    pub path: PathBuf,
    /// Rendered text.
    pub contents: String,
}

/// Render `table` in `format` into a file under `dir`.
pub fn render_artifact(table: &TuningTable, format: ArtifactFormat, dir: &Path) -> Result<Artifact> {
    let contents = match format {
        ArtifactFormat::C => {
            let thresholds = table.thresholds()?;
            format!(
                "/* Generated by simexp-tune. */\n\n{}\n\n{}\n",
                c_array::modulus_array(&thresholds, MODULUS_ARRAY_NAME),
                c_array::threshold_array(&thresholds, THRESHOLD_ARRAY_NAME)
            )
        }
        ArtifactFormat::Rust => {
            let thresholds = table.thresholds()?;
            format!(
                "// Generated by simexp-tune.\n\n{}\n\n{}\n",
                c_array::rust_modulus_const(&thresholds, MODULUS_ARRAY_NAME),
                c_array::rust_threshold_const(&thresholds, THRESHOLD_ARRAY_NAME)
            )
        }
        ArtifactFormat::Json => to_json_pretty(table)? + "\n",
    };
    Ok(Artifact {
        path: dir.join(format.file_name()),
        contents,
    })
}

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never observe a half-written artifact.
pub fn write_artifact(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_path = path.to_path_buf();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("tmp");
    temp_path.set_extension(format!("{ext}.simexp-tmp"));
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
