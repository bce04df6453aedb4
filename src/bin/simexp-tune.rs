//! CLI for tuning the block width of simultaneous exponentiation.
//!
//! # Usage
//!
//! ```bash
//! # Reference sweep against the timing program in the current directory
//! cargo run --release --bin simexp-tune -- --command ./mpz_simexp_time
//!
//! # Quick dry run with the cost model, Rust constants instead of C arrays
//! cargo run --bin simexp-tune -- --preset quick --simulate --format rust
//!
//! # Custom grid, resuming an interrupted run
//! cargo run --release --bin simexp-tune -- \
//!   --modulus 1024,2048 \
//!   --exponents 100:4096:50 \
//!   --max-block-width 10 --inclusive \
//!   --output ./tuning --resume
//! ```

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use simexp_tune::config::{parse_bitlens, parse_exponent_bitlens};
use simexp_tune::dispatch::disagreements;
use simexp_tune::output::{
    format_modulus_table, render_artifact, MODULUS_ARRAY_NAME, THRESHOLD_ARRAY_NAME,
};
use simexp_tune::{
    write_artifact, ArtifactFormat, CommandHarness, Harness, SimulatedHarness, SweepBound,
    SweepRunner, TuningConfig,
};

/// Measure simultaneous exponentiation and emit block-width threshold tables
#[derive(Parser, Debug)]
#[command(name = "simexp-tune")]
#[command(about = "Tune the block width of simultaneous modular exponentiation")]
#[command(version)]
struct Args {
    /// Preset configuration: reference (full grid), quick (smoke test)
    #[arg(short, long, default_value = "reference")]
    preset: String,

    /// JSON configuration file (replaces the preset; flags still override)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timing program, invoked as `<command> -ps <samples> <mbl> <ebl> <bw>`
    #[arg(long, default_value = simexp_tune::harness::DEFAULT_COMMAND)]
    command: PathBuf,

    /// Use the built-in cost model instead of the timing program
    #[arg(long)]
    simulate: bool,

    /// Modulus bit-lengths (comma-separated, e.g. "256,512,1024")
    #[arg(short, long)]
    modulus: Option<String>,

    /// Exponent bit-lengths: comma-separated list or `start:end:step` (end exclusive)
    #[arg(short, long)]
    exponents: Option<String>,

    /// Largest block width of the sweep
    #[arg(long)]
    max_block_width: Option<usize>,

    /// Measure `--max-block-width` itself (default: widths below it)
    #[arg(long)]
    inclusive: bool,

    /// Work budget per cell; samples = budget / (mbl * ebl)
    #[arg(long)]
    work_budget: Option<u64>,

    /// Kill a harness invocation after this many seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Retries for a failed cell before aborting
    #[arg(long)]
    retries: Option<usize>,

    /// Concurrent harness invocations (may skew timings)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Abort when the best block width decreases with the exponent
    #[arg(long)]
    strict: bool,

    /// Output directory for artifacts and the measurement log
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Artifact formats (comma-separated: c, rust, json)
    #[arg(short, long, default_value = "c")]
    format: String,

    /// Resume an interrupted sweep from the measurement log
    #[arg(long)]
    resume: bool,

    /// Do not keep a measurement log
    #[arg(long)]
    no_checkpoint: bool,

    /// Show debug logs for every cell
    #[arg(short, long)]
    verbose: bool,

    /// Only print warnings and the final arrays
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(2);
    }

    let formats: Vec<ArtifactFormat> = match args
        .format
        .split(',')
        .map(|s| ArtifactFormat::from_name(s.trim()).ok_or(s.trim()))
        .collect::<Result<_, _>>()
    {
        Ok(formats) => formats,
        Err(name) => {
            eprintln!("Unknown format '{}'. Available: c, rust, json", name);
            std::process::exit(2);
        }
    };

    let harness: Box<dyn Harness> = if args.simulate {
        Box::new(SimulatedHarness::default())
    } else {
        Box::new(CommandHarness::new(&args.command).timeout(config.harness_timeout()))
    };

    if !args.quiet {
        print_config(&config, harness.name());
    }

    let mut runner = SweepRunner::new(harness);
    let checkpoint_path = args.output.join("simexp_measurements.csv");
    if !args.no_checkpoint || args.resume {
        if let Err(e) = std::fs::create_dir_all(&args.output) {
            eprintln!("Failed to create output directory: {}", e);
            std::process::exit(1);
        }
        runner = match runner.with_checkpoint_file(&checkpoint_path, args.resume) {
            Ok(runner) => runner,
            Err(e) => {
                eprintln!("Failed to open measurement log: {}", e);
                std::process::exit(1);
            }
        };
    }

    let total = config.total_cells() as u64;
    let progress_bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    progress_bar.enable_steady_tick(std::time::Duration::from_millis(100));

    let start = Instant::now();
    let result = runner.run_with(
        &config,
        |progress, task| {
            progress_bar.set_position((progress * total as f64) as u64);
            let elapsed = start.elapsed().as_secs_f64();
            let msg = if progress > 0.05 {
                let eta = elapsed / progress * (1.0 - progress);
                format!("ETA: {} | {}", format_eta(eta), task)
            } else {
                task.to_string()
            };
            progress_bar.set_message(msg);
        },
        |mbl, bitlens| {
            if !args.quiet {
                progress_bar.suspend(|| print!("{}", format_modulus_table(mbl, bitlens)));
            }
        },
    );
    progress_bar.finish_and_clear();

    let table = match result {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            if !args.no_checkpoint {
                eprintln!(
                    "Completed measurements are kept in {}; rerun with --resume to continue.",
                    checkpoint_path.display()
                );
            }
            std::process::exit(1);
        }
    };

    if !args.quiet {
        println!("Completed in {:.1}s\n", start.elapsed().as_secs_f64());
    }

    match disagreements(&table) {
        Ok(found) if !found.is_empty() => {
            println!(
                "{} lookup disagrees with the fastest width at {} point(s):",
                "note:".yellow().bold(),
                found.len()
            );
            for d in &found {
                println!(
                    "  mbl={} ebl={}: measured {}, selected {}",
                    d.modulus_bitlen, d.exponent_bitlen, d.measured, d.selected
                );
            }
            println!();
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Cannot replay lookup: {}", e),
    }

    let arrays = table
        .modulus_bitlen_array(MODULUS_ARRAY_NAME)
        .and_then(|m| {
            table
                .best_block_widths_thresholds(THRESHOLD_ARRAY_NAME)
                .map(|t| (m, t))
        });
    match arrays {
        Ok((modulus, thresholds)) => {
            println!("{}\n", modulus);
            println!("{}", thresholds);
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }

    for format in formats {
        let artifact = match render_artifact(&table, format, &args.output) {
            Ok(artifact) => artifact,
            Err(e) => {
                eprintln!("Failed to render {:?} artifact: {}", format, e);
                std::process::exit(1);
            }
        };
        if let Err(e) = write_artifact(&artifact.path, &artifact.contents) {
            eprintln!(
                "Failed to write generated artifact '{}': {}",
                artifact.path.display(),
                e
            );
            std::process::exit(1);
        }
        if !args.quiet {
            eprintln!("Generated: {}", artifact.path.display());
        }
    }
}

fn init_logging(args: &Args) {
    let default = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Preset or config file, then flag overrides.
fn build_config(args: &Args) -> Result<TuningConfig, String> {
    let mut config = match &args.config {
        Some(path) => TuningConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => TuningConfig::preset(&args.preset).ok_or_else(|| {
            format!(
                "Unknown preset '{}'. Available: reference, quick",
                args.preset
            )
        })?,
    };

    if let Some(modulus) = &args.modulus {
        config.modulus_bitlens = parse_bitlens(modulus).map_err(|e| e.to_string())?;
    }
    if let Some(exponents) = &args.exponents {
        config.exponent_bitlens = parse_exponent_bitlens(exponents).map_err(|e| e.to_string())?;
    }
    if let Some(max) = args.max_block_width {
        config.max_block_width = max;
    }
    if args.inclusive {
        config.block_width_bound = SweepBound::Inclusive;
    }
    if let Some(budget) = args.work_budget {
        config.work_budget = budget;
    }
    if let Some(timeout) = args.timeout {
        config.harness_timeout_secs = Some(timeout);
    }
    if let Some(retries) = args.retries {
        config.max_retries = retries;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if args.strict {
        config.strict_monotonicity = true;
    }
    Ok(config)
}

fn print_config(config: &TuningConfig, harness: &str) {
    println!("=== Simultaneous Exponentiation Block-Width Tuning ===\n");
    println!("Configuration:");
    println!("  Harness: {}", harness);
    println!("  Modulus bit-lengths: {:?}", config.modulus_bitlens);
    match (
        config.exponent_bitlens.first(),
        config.exponent_bitlens.last(),
    ) {
        (Some(first), Some(last)) => println!(
            "  Exponent bit-lengths: {} values, {}..={}",
            config.exponent_bitlens.len(),
            first,
            last
        ),
        _ => println!("  Exponent bit-lengths: none"),
    }
    println!("  Block widths: 1..={}", config.last_block_width());
    println!("  Work budget: {}", config.work_budget);
    if let Some(timeout) = config.harness_timeout_secs {
        println!("  Timeout: {}s (retries: {})", timeout, config.max_retries);
    }
    if config.jobs > 1 {
        println!("  Jobs: {}", config.jobs);
    }
    println!("  Total cells: {}", config.total_cells());
    println!();
}

fn format_eta(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0}s", secs)
    } else if secs < 3600.0 {
        format!("{}m {}s", (secs / 60.0) as u64, (secs % 60.0) as u64)
    } else {
        format!(
            "{}h {}m",
            (secs / 3600.0) as u64,
            ((secs % 3600.0) / 60.0) as u64
        )
    }
}
