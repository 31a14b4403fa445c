//! End-to-end pipeline test: raw CSVs in, scoring decisions out.
//!
//! Exercises merge, stratified split, training, atomic publish, artifact
//! loading, and the scoring function against a temporary directory, the same
//! sequence an operator runs with the CLI tools.

use std::collections::HashMap;
use std::path::Path;

use credit_risk::artifacts::{
    ArtifactBundle, FEATURE_NAMES_FILE, IMPUTE_VALUES_FILE, MODEL_FILE, SCALER_FILE,
};
use credit_risk::features::{FieldMap, FieldValue};
use credit_risk::schema::{LOAN_SOURCE, unify};
use credit_risk::service::{THRESHOLD, score};
use credit_risk::split::{SPLIT_SEED, split_dataset};
use credit_risk::table::Table;
use credit_risk::trainer::{TrainConfig, train_and_publish};

/// Raw loan dataset with a strong credit-score signal: the first `bad` rows
/// default with low scores, the remainder repay with high scores.
fn loan_source_table(good: usize, bad: usize) -> Table {
    let mut table = Table::new([
        "LoanID",
        "Age",
        "Income",
        "LoanAmount",
        "CreditScore",
        "DTIRatio",
        "Default",
    ]);
    for i in 0..(good + bad) {
        let is_bad = i < bad;
        let credit_score = if is_bad { 320 + i * 7 } else { 660 + i * 2 };
        let income = 20_000 + i * 900;
        table
            .push_row(vec![
                Some(format!("L{i:04}")),
                Some((21 + i % 40).to_string()),
                Some(income.to_string()),
                Some((5_000 + i * 300).to_string()),
                Some(credit_score.to_string()),
                Some(format!("{:.2}", 0.1 + (i % 9) as f64 * 0.05)),
                Some(if is_bad { "Yes" } else { "No" }.to_string()),
            ])
            .unwrap();
    }
    table
}

fn score_fields(credit_score: f64, income: f64) -> HashMap<String, FieldValue> {
    let mut fields = HashMap::new();
    fields.insert("credit_score".to_string(), FieldValue::Number(credit_score));
    fields.insert("annual_income".to_string(), FieldValue::Number(income));
    fields
}

fn write_field_map(dir: &Path) -> FieldMap {
    let path = dir.join("field_map.json");
    std::fs::write(
        &path,
        r#"{"credit_score": "CreditScore", "annual_income": "Income"}"#,
    )
    .unwrap();
    FieldMap::from_json_file(&path).unwrap()
}

#[test]
fn merge_split_train_publish_and_score() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("Loan.csv");
    let combined_path = dir.path().join("combined_credit_data.csv");
    let data_dir = dir.path().join("data");
    let artifact_dir = dir.path().join("artifacts");

    // Merge: one raw source through its rename table onto the unified schema.
    loan_source_table(40, 20).to_csv(&raw_path).unwrap();
    let raw = Table::from_csv(&raw_path).unwrap();
    let combined = unify(vec![(LOAN_SOURCE, raw)]).unwrap();
    assert_eq!(combined.columns().len(), 38);
    assert_eq!(combined.n_rows(), 60);
    combined.to_csv(&combined_path).unwrap();

    // Split: stratified 70/20/10 over the 60 labeled rows.
    let combined = Table::from_csv(&combined_path).unwrap();
    let partitions = split_dataset(&combined, SPLIT_SEED).unwrap();
    assert_eq!(partitions.train.n_rows(), 42);
    assert_eq!(partitions.val.n_rows(), 12);
    assert_eq!(partitions.test.n_rows(), 6);
    partitions.write(&data_dir).unwrap();

    // Train both candidates and publish the winner.
    let config = TrainConfig::new(data_dir, artifact_dir.clone());
    let outcome = train_and_publish(&config).unwrap();
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.feature_names.len(), 36);
    assert!(
        outcome
            .reports
            .iter()
            .any(|report| report.name == outcome.selected)
    );
    for name in [MODEL_FILE, SCALER_FILE, FEATURE_NAMES_FILE, IMPUTE_VALUES_FILE] {
        assert!(artifact_dir.join(name).is_file(), "missing {name}");
    }

    // Serve: load the published bundle and score like the HTTP handler does.
    let bundle = ArtifactBundle::load(&artifact_dir).unwrap();
    assert_eq!(bundle.feature_names, outcome.feature_names);
    let field_map = write_field_map(&artifact_dir);

    let risky = score(&bundle, &field_map, &score_fields(330.0, 21_000.0));
    let solid = score(&bundle, &field_map, &score_fields(780.0, 60_000.0));
    assert!(
        risky.probability_bad > solid.probability_bad,
        "low credit score must not look safer: {} vs {}",
        risky.probability_bad,
        solid.probability_bad
    );
    for decision in [&risky, &solid] {
        assert!((0.0..=1.0).contains(&decision.probability_bad));
        assert_eq!(decision.threshold_used, THRESHOLD);
        let expected = if decision.probability_bad >= THRESHOLD {
            "Bad Credit"
        } else {
            "Good Credit"
        };
        assert_eq!(decision.prediction, expected);
    }

    // Identical input, identical decision.
    let again = score(&bundle, &field_map, &score_fields(330.0, 21_000.0));
    assert_eq!(risky, again);
}

#[test]
fn repeated_splits_are_byte_identical_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let combined = unify(vec![(LOAN_SOURCE, loan_source_table(30, 12))]).unwrap();

    let first_dir = dir.path().join("first");
    let second_dir = dir.path().join("second");
    split_dataset(&combined, SPLIT_SEED)
        .unwrap()
        .write(&first_dir)
        .unwrap();
    split_dataset(&combined, SPLIT_SEED)
        .unwrap()
        .write(&second_dir)
        .unwrap();

    for part in ["train/train.csv", "val/val.csv", "test/test.csv"] {
        let first = std::fs::read(first_dir.join(part)).unwrap();
        let second = std::fs::read(second_dir.join(part)).unwrap();
        assert_eq!(first, second, "{part} differs between identical runs");
    }
}

#[test]
fn republish_replaces_artifacts_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let artifact_dir = dir.path().join("artifacts");

    let combined = unify(vec![(LOAN_SOURCE, loan_source_table(40, 20))]).unwrap();
    split_dataset(&combined, SPLIT_SEED)
        .unwrap()
        .write(&data_dir)
        .unwrap();

    let config = TrainConfig::new(data_dir, artifact_dir.clone());
    train_and_publish(&config).unwrap();
    let first = std::fs::read(artifact_dir.join(MODEL_FILE)).unwrap();

    // A second run over the same partitions must land a complete bundle and
    // leave no staging directory behind.
    train_and_publish(&config).unwrap();
    let second = std::fs::read(artifact_dir.join(MODEL_FILE)).unwrap();
    assert_eq!(first, second);
    assert!(ArtifactBundle::load(&artifact_dir).is_ok());
    assert!(!dir.path().join("artifacts.staging").exists());
}
