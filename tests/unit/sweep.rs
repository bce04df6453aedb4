//! End-to-end sweeps with in-process and scripted harnesses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use simexp_tune::output::{render_artifact, to_json};
use simexp_tune::{
    write_artifact, ArtifactFormat, Cell, FnHarness, HarnessError, SimulatedHarness, SweepBound,
    SweepRunner, TuneError, TuningConfig,
};

fn grid(moduli: &[usize], exponents: &[usize], max_block_width: usize) -> TuningConfig {
    TuningConfig {
        modulus_bitlens: moduli.to_vec(),
        exponent_bitlens: exponents.to_vec(),
        max_block_width,
        block_width_bound: SweepBound::Inclusive,
        ..TuningConfig::reference()
    }
}

// =============================================================================
// GRID AND AGGREGATION
// =============================================================================

#[test]
fn harness_sees_every_cell_once_in_grid_order() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = seen.clone();
    let harness = FnHarness::new("record", move |cell: &Cell| {
        log.lock().unwrap().push(*cell);
        Ok(cell.block_width as f64)
    });

    let config = TuningConfig {
        block_width_bound: SweepBound::Exclusive,
        ..grid(&[512, 256], &[300, 100], 4)
    };
    SweepRunner::new(Box::new(harness))
        .run(&config, |_, _| {})
        .unwrap();

    let seen = seen.lock().unwrap();
    let order: Vec<(usize, usize, usize)> = seen
        .iter()
        .map(|c| (c.modulus_bitlen, c.exponent_bitlen, c.block_width))
        .collect();
    assert_eq!(
        order,
        vec![
            (512, 300, 1),
            (512, 300, 2),
            (512, 300, 3),
            (512, 100, 1),
            (512, 100, 2),
            (512, 100, 3),
            (256, 300, 1),
            (256, 300, 2),
            (256, 300, 3),
            (256, 100, 1),
            (256, 100, 2),
            (256, 100, 3),
        ]
    );
    assert_eq!(seen[0].sample_count, config.sample_count(512, 300));
}

#[test]
fn scripted_optima_become_threshold_rows() {
    // Best width per (mbl, ebl), as a timing program would reveal it.
    fn best(mbl: usize, ebl: usize) -> usize {
        match (mbl, ebl) {
            (256, 100) => 1,
            (256, 150) => 2,
            (256, 200) => 2,
            (256, 250) => 4,
            (512, 100) => 2,
            (512, 150) => 3,
            (512, 200) => 5,
            (512, 250) => 5,
            _ => unreachable!(),
        }
    }
    let harness = FnHarness::new("scripted", |cell: &Cell| {
        let b = best(cell.modulus_bitlen, cell.exponent_bitlen) as f64;
        Ok(1.0 + (cell.block_width as f64 - b).abs())
    });

    let table = SweepRunner::new(Box::new(harness))
        .run(&grid(&[256, 512], &[100, 150, 200, 250], 5), |_, _| {})
        .unwrap();

    assert_eq!(
        table.modulus_bitlen_array("modulus_bitlens").unwrap(),
        "int modulus_bitlens[2] = {256, 512};"
    );
    assert_eq!(
        table.best_block_widths_thresholds("best_block_widths").unwrap(),
        "int best_block_widths[2][5] = \n{\n{100, 150, 250, 250, 0},\n{100, 100, 150, 200, 200}\n};"
    );
}

#[test]
fn simulated_reference_shape() {
    let config = TuningConfig {
        modulus_bitlens: vec![256, 1024],
        ..TuningConfig::reference()
    };
    let table = SweepRunner::new(Box::new(SimulatedHarness::default()))
        .run(&config, |_, _| {})
        .unwrap();

    let thresholds = table.thresholds().unwrap();
    // Exclusive bound of 12: widths 1 to 11, so 11 columns.
    assert_eq!(thresholds.columns(), 11);
    for row in thresholds.rows() {
        let nonzero: Vec<usize> = row.thresholds.iter().copied().take_while(|&t| t != 0).collect();
        assert!(nonzero.windows(2).all(|w| w[0] <= w[1]));
        assert!(row.thresholds[nonzero.len()..].iter().all(|&t| t == 0));
    }
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn persistent_failure_aborts_with_cell() {
    let harness = FnHarness::new("broken", |cell: &Cell| {
        if cell.modulus_bitlen == 512 {
            Err(HarnessError::ExitStatus {
                status: "exit status: 1".to_string(),
                stderr: "out of memory".to_string(),
            })
        } else {
            Ok(1.0)
        }
    });
    let config = TuningConfig {
        max_retries: 2,
        ..grid(&[256, 512], &[100], 3)
    };
    let err = SweepRunner::new(Box::new(harness))
        .run(&config, |_, _| {})
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("mbl=512"), "{message}");
    assert!(message.contains("out of memory"), "{message}");
}

#[test]
fn retries_are_bounded() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let harness = FnHarness::new("never", move |_: &Cell| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(HarnessError::Parse {
            output: String::new(),
        })
    });
    let config = TuningConfig {
        max_retries: 3,
        ..grid(&[256], &[100], 2)
    };
    assert!(matches!(
        SweepRunner::new(Box::new(harness)).run(&config, |_, _| {}),
        Err(TuneError::Harness { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// =============================================================================
// RESUME AND ARTIFACTS
// =============================================================================

#[test]
fn interrupted_sweep_resumes_where_it_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("measurements.csv");
    let config = grid(&[256, 512], &[100, 200], 3);

    // First run dies on the second modulus.
    let first = FnHarness::new("dies", |cell: &Cell| {
        if cell.modulus_bitlen == 512 {
            Err(HarnessError::Timeout {
                after: std::time::Duration::from_secs(1),
            })
        } else {
            Ok(SimulatedHarness::default().model_seconds(cell))
        }
    });
    assert!(SweepRunner::new(Box::new(first))
        .with_checkpoint_file(&log, false)
        .unwrap()
        .run(&config, |_, _| {})
        .is_err());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let second = FnHarness::new("resumed", move |cell: &Cell| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(SimulatedHarness::default().model_seconds(cell))
    });
    let resumed = SweepRunner::new(Box::new(second))
        .with_checkpoint_file(&log, true)
        .unwrap()
        .run(&config, |_, _| {})
        .unwrap();

    // Only the 512-bit cells are measured again.
    assert_eq!(calls.load(Ordering::SeqCst), 2 * 3);

    let fresh = SweepRunner::new(Box::new(SimulatedHarness::default()))
        .run(&config, |_, _| {})
        .unwrap();
    assert_eq!(resumed, fresh);
}

#[test]
fn artifacts_are_written_for_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let table = SweepRunner::new(Box::new(SimulatedHarness::default()))
        .run(&grid(&[256, 512], &[100, 400, 1600], 6), |_, _| {})
        .unwrap();

    for format in [ArtifactFormat::C, ArtifactFormat::Rust, ArtifactFormat::Json] {
        let artifact = render_artifact(&table, format, dir.path()).unwrap();
        write_artifact(&artifact.path, &artifact.contents).unwrap();
        assert_eq!(
            std::fs::read_to_string(&artifact.path).unwrap(),
            artifact.contents
        );
    }

    let c = std::fs::read_to_string(dir.path().join("simexp_thresholds.h")).unwrap();
    assert!(c.contains("int modulus_bitlens[2] = {256, 512};"));
    assert!(c.contains("int best_block_widths[2][6] = \n{\n"));

    let rust = std::fs::read_to_string(dir.path().join("simexp_thresholds.rs")).unwrap();
    assert!(rust.contains("pub const MODULUS_BITLENS: [usize; 2] = [256, 512];"));
    assert!(rust.contains("pub const BEST_BLOCK_WIDTHS: [[usize; 6]; 2] = ["));

    let json: serde_json::Value = serde_json::from_str(&to_json(&table).unwrap()).unwrap();
    assert_eq!(json["thresholds"]["rows"].as_array().unwrap().len(), 2);
}

#[cfg(unix)]
#[test]
fn command_harness_end_to_end() {
    use simexp_tune::CommandHarness;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("mpz_simexp_time");
    // Fastest width is 1 below ebl 200 and 2 from there on.
    std::fs::write(
        &script,
        "#!/bin/sh\n[ \"$1\" = \"-ps\" ] || exit 3\nif [ \"$4\" -lt 200 ]; then best=1; else best=2; fi\nif [ \"$5\" -eq \"$best\" ]; then echo 0.5; else echo 1.0; fi\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = TuningConfig {
        harness_timeout_secs: Some(10.0),
        ..grid(&[256], &[100, 200, 300], 3)
    };
    let harness = CommandHarness::new(&script).timeout(config.harness_timeout());
    let table = SweepRunner::new(Box::new(harness))
        .run(&config, |_, _| {})
        .unwrap();

    assert_eq!(
        table.best_block_widths_thresholds("t").unwrap(),
        "int t[1][3] = \n{\n{100, 200, 0}\n};"
    );
}
