//! Runtime lookup against tables produced by the tuner.

use simexp_tune::dispatch::disagreements;
use simexp_tune::{theoretical_block_width, SimulatedHarness, SweepRunner, TuningConfig};

fn simulated_table() -> simexp_tune::TuningTable {
    let config = TuningConfig {
        modulus_bitlens: vec![256, 512, 1024],
        exponent_bitlens: TuningConfig::exponent_range(100, 2048, 100).unwrap(),
        ..TuningConfig::quick()
    };
    SweepRunner::new(Box::new(SimulatedHarness::default()))
        .run(&config, |_, _| {})
        .unwrap()
}

#[test]
fn lookup_reproduces_measured_optimum() {
    let table = simulated_table();
    assert!(disagreements(&table).unwrap().is_empty());

    let thresholds = table.thresholds().unwrap();
    for (mbl, bitlens) in table.iter() {
        for (ebl, timings) in bitlens.iter() {
            assert_eq!(
                thresholds.select_block_width(mbl, ebl),
                timings.best_block_width().unwrap(),
                "mbl={mbl} ebl={ebl}"
            );
        }
    }
}

#[test]
fn lookup_between_grid_points_uses_lower_step() {
    let thresholds = simulated_table().thresholds().unwrap();
    let row = thresholds.row(512).unwrap();
    // Between two measured exponents the width of the lower one applies.
    assert_eq!(
        thresholds.select_block_width(512, 1050),
        row.select_block_width(1000)
    );
    // Moduli between rows use the smaller row.
    assert_eq!(
        thresholds.select_block_width(700, 1000),
        row.select_block_width(1000)
    );
}

#[test]
fn simulated_optimum_tracks_estimate() {
    // The cost model and the estimate share the same operation count.
    let table = simulated_table();
    let bitlens = table.get(1024).unwrap();
    for (ebl, timings) in bitlens.iter() {
        let measured = timings.best_block_width().unwrap() as i64;
        let estimate = theoretical_block_width(ebl).min(8) as i64;
        assert!((measured - estimate).abs() <= 1, "ebl={ebl}");
    }
}
