//! Tests for sweep configuration.

use simexp_tune::config::{parse_bitlens, parse_exponent_bitlens};
use simexp_tune::{SweepBound, TuneError, TuningConfig, DEFAULT_WORK_BUDGET};

// =============================================================================
// PRESETS
// =============================================================================

#[test]
fn reference_measures_widths_below_twelve() {
    let config = TuningConfig::reference();
    assert_eq!(config.max_block_width, 12);
    assert_eq!(config.block_width_bound, SweepBound::Exclusive);
    assert_eq!(config.block_widths().collect::<Vec<_>>(), (1..=11).collect::<Vec<_>>());
}

#[test]
fn reference_exponents_stop_below_twice_largest_modulus() {
    let config = TuningConfig::reference();
    assert!(config.exponent_bitlens.iter().all(|&e| e < 2 * 2048));
    assert!(config
        .exponent_bitlens
        .windows(2)
        .all(|w| w[1] - w[0] == 50));
}

#[test]
fn quick_preset_is_valid_and_inclusive() {
    let config = TuningConfig::quick();
    config.validate().unwrap();
    assert_eq!(config.block_width_bound, SweepBound::Inclusive);
    assert_eq!(config.last_block_width(), 8);
}

// =============================================================================
// SAMPLE COUNT
// =============================================================================

#[test]
fn sample_count_keeps_work_constant() {
    let config = TuningConfig::reference();
    assert_eq!(config.work_budget, DEFAULT_WORK_BUDGET);
    // 2e9 / (512 * 1000)
    assert_eq!(config.sample_count(512, 1000), 3906);
    assert!(config.sample_count(256, 100) > config.sample_count(2048, 100));
}

#[test]
fn sample_count_never_zero() {
    let config = TuningConfig {
        work_budget: 1,
        ..TuningConfig::reference()
    };
    assert_eq!(config.sample_count(4096, 8192), 1);
}

// =============================================================================
// VALIDATION
// =============================================================================

#[test]
fn exclusive_bound_of_one_measures_nothing() {
    let config = TuningConfig {
        max_block_width: 1,
        block_width_bound: SweepBound::Exclusive,
        ..TuningConfig::quick()
    };
    assert_eq!(config.total_cells(), 0);
    assert!(matches!(config.validate(), Err(TuneError::Config(_))));
}

#[test]
fn duplicate_exponents_rejected() {
    let config = TuningConfig {
        exponent_bitlens: vec![100, 200, 100],
        ..TuningConfig::quick()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("100"));
}

#[test]
fn zero_work_budget_rejected() {
    let config = TuningConfig {
        work_budget: 0,
        ..TuningConfig::quick()
    };
    assert!(config.validate().is_err());
}

#[test]
fn config_file_overrides_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tune.json");
    std::fs::write(
        &path,
        r#"{
            "modulus_bitlens": [384],
            "exponent_bitlens": [100, 300, 900],
            "max_block_width": 6,
            "block_width_bound": "inclusive",
            "harness_timeout_secs": 30.0,
            "max_retries": 2
        }"#,
    )
    .unwrap();

    let config = TuningConfig::from_json_file(&path).unwrap();
    assert_eq!(config.modulus_bitlens, vec![384]);
    assert_eq!(config.total_cells(), 3 * 6);
    assert_eq!(
        config.harness_timeout(),
        Some(std::time::Duration::from_secs(30))
    );
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.jobs, 1);
    config.validate().unwrap();
}

#[test]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tune.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        TuningConfig::from_json_file(&path),
        Err(TuneError::Json(_))
    ));
    assert!(matches!(
        TuningConfig::from_json_file(&dir.path().join("missing.json")),
        Err(TuneError::Io(_))
    ));
}

// =============================================================================
// GRID PARSING
// =============================================================================

#[test]
fn exponent_range_syntax_is_end_exclusive() {
    assert_eq!(
        parse_exponent_bitlens("100:400:100").unwrap(),
        vec![100, 200, 300]
    );
    assert_eq!(
        parse_exponent_bitlens("100, 150,900").unwrap(),
        vec![100, 150, 900]
    );
    assert_eq!(parse_bitlens("256,512").unwrap(), vec![256, 512]);
}

#[test]
fn zero_exponent_step_rejected() {
    assert!(matches!(
        parse_exponent_bitlens("100:200:0"),
        Err(TuneError::Config(_))
    ));
    assert!(TuningConfig::exponent_range(100, 200, 0).is_err());
}

#[test]
fn malformed_grid_lists_rejected() {
    assert!(parse_bitlens("256,abc").is_err());
    assert!(parse_exponent_bitlens("100:200").is_err());
    assert!(parse_exponent_bitlens("100:x:50").is_err());
}
