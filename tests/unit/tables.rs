//! Measurements flowing from the tables into lookup and rendered artifacts.

use simexp_tune::dispatch::disagreements;
use simexp_tune::output::c_array;
use simexp_tune::{BitlenTable, TimingVector, TuningTable};

fn bitlen_table(modulus_bitlen: usize, rows: &[(usize, &[f64])]) -> BitlenTable {
    let mut table = BitlenTable::new(modulus_bitlen);
    for &(ebl, times) in rows {
        table
            .add(ebl, TimingVector::from_times(times.iter().copied()).unwrap())
            .unwrap();
    }
    table
}

/// 256 measured up to width 5, 512 only up to width 3, inserted out of order.
fn measured() -> TuningTable {
    let mut tuning = TuningTable::new();
    tuning
        .add(
            512,
            bitlen_table(
                512,
                &[
                    (150, &[3.0, 2.5, 2.0]),
                    (100, &[1.0, 1.2, 1.5]),
                ],
            ),
        )
        .unwrap();
    tuning
        .add(
            256,
            bitlen_table(
                256,
                &[
                    (100, &[1.0, 1.1, 1.3, 1.6, 2.0]),
                    (150, &[1.4, 1.2, 1.3, 1.5, 1.9]),
                    (200, &[1.9, 1.5, 1.6, 1.7, 1.8]),
                    (250, &[2.6, 2.0, 1.9, 1.8, 1.85]),
                ],
            ),
        )
        .unwrap();
    tuning
}

// =============================================================================
// ARTIFACTS
// =============================================================================

#[test]
fn every_format_renders_the_same_rows() {
    let tuning = measured();
    let thresholds = tuning.thresholds().unwrap();
    assert_eq!(thresholds.columns(), 5);

    assert_eq!(
        tuning.modulus_bitlen_array("modulus_bitlens").unwrap(),
        "int modulus_bitlens[2] = {256, 512};"
    );
    assert_eq!(
        tuning.best_block_widths_thresholds("best_block_widths").unwrap(),
        "int best_block_widths[2][5] = \n{\n{100, 150, 250, 250, 0},\n{100, 150, 150, 0, 0}\n};"
    );
    assert_eq!(
        c_array::rust_modulus_const(&thresholds, "modulus_bitlens"),
        "pub const MODULUS_BITLENS: [usize; 2] = [256, 512];"
    );
    assert_eq!(
        c_array::rust_threshold_const(&thresholds, "best_block_widths"),
        "pub const BEST_BLOCK_WIDTHS: [[usize; 5]; 2] = [\n    [100, 150, 250, 250, 0],\n    [100, 150, 150, 0, 0],\n];"
    );
}

// =============================================================================
// LOOKUP
// =============================================================================

#[test]
fn lookup_selects_measured_optimum() {
    let tuning = measured();
    let thresholds = tuning.thresholds().unwrap();
    assert!(disagreements(&tuning).unwrap().is_empty());

    assert_eq!(thresholds.select_block_width(256, 100), 1);
    assert_eq!(thresholds.select_block_width(256, 249), 2);
    assert_eq!(thresholds.select_block_width(256, 250), 4);
    assert_eq!(thresholds.select_block_width(512, 150), 3);
    // Below the smallest exponent no threshold is reached.
    assert_eq!(thresholds.select_block_width(512, 50), 1);
}

#[test]
fn dip_is_both_flagged_and_visible_in_lookup() {
    let mut tuning = TuningTable::new();
    tuning
        .add(
            1024,
            bitlen_table(
                1024,
                &[
                    (100, &[1.0, 2.0, 3.0, 4.0]),
                    (150, &[3.0, 2.0, 1.0, 2.0]),
                    (200, &[2.0, 1.0, 2.0, 3.0]),
                    (250, &[3.0, 2.0, 1.0, 2.0]),
                ],
            ),
        )
        .unwrap();

    let violations = tuning.monotonicity_violations().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].1[0].exponent_bitlen, 200);

    assert_eq!(
        tuning.thresholds().unwrap().rows()[0].thresholds,
        vec![100, 150, 150, 0]
    );
    let found = disagreements(&tuning).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].exponent_bitlen, 200);
    assert_eq!((found[0].measured, found[0].selected), (2, 3));
}
