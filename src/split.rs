//! Stratified train/validation/test partitioning of the combined dataset.
//!
//! The split is seeded and fully deterministic: identical input content and
//! order always produce byte-identical partition files. Net ratios are
//! roughly 70/20/10 (70% train, then the 30% remainder split 67/33 into
//! validation and test), stratified on the `Default` label.

use std::path::{Path, PathBuf};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::table::{Table, TableError};

/// Label column shared by all partitions.
pub const LABEL_COLUMN: &str = "Default";
/// Fixed seed so partitioning is reproducible.
pub const SPLIT_SEED: u64 = 42;
/// Fraction carved off the full dataset for validation + test.
pub const TEMP_FRACTION: f64 = 0.30;
/// Fraction of the temp partition that becomes the test set.
pub const TEST_FRACTION_OF_TEMP: f64 = 0.33;

/// Errors raised while partitioning.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("label column `{0}` not found")]
    MissingLabelColumn(String),
    #[error(
        "label class `{class}` has {count} member(s); stratified splitting needs at least 2 per class"
    )]
    ClassTooSmall { class: String, count: usize },
    #[error("no labeled rows left after dropping null labels")]
    NoLabeledRows,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// The three persisted partitions.
#[derive(Debug, Clone)]
pub struct Partitions {
    pub train: Table,
    pub val: Table,
    pub test: Table,
}

impl Partitions {
    /// Canonical partition paths under a data directory.
    pub fn paths(data_dir: &Path) -> [PathBuf; 3] {
        [
            data_dir.join("train").join("train.csv"),
            data_dir.join("val").join("val.csv"),
            data_dir.join("test").join("test.csv"),
        ]
    }

    /// Persist all three partitions under `data_dir`.
    pub fn write(&self, data_dir: &Path) -> Result<(), SplitError> {
        let [train, val, test] = Self::paths(data_dir);
        self.train.to_csv(&train)?;
        self.val.to_csv(&val)?;
        self.test.to_csv(&test)?;
        info!(
            train = self.train.n_rows(),
            val = self.val.n_rows(),
            test = self.test.n_rows(),
            dir = %data_dir.display(),
            "partitions written"
        );
        Ok(())
    }

    /// Load all three partitions from `data_dir`.
    pub fn read(data_dir: &Path) -> Result<Partitions, SplitError> {
        let [train, val, test] = Self::paths(data_dir);
        Ok(Partitions {
            train: Table::from_csv(&train)?,
            val: Table::from_csv(&val)?,
            test: Table::from_csv(&test)?,
        })
    }
}

/// Drop rows with a null label and map textual `Yes`/`No` labels to `1`/`0`.
/// Unrecognized textual labels pass through unchanged.
pub fn clean_labels(table: &Table) -> Result<Table, SplitError> {
    let label_idx = table
        .column_index(LABEL_COLUMN)
        .ok_or_else(|| SplitError::MissingLabelColumn(LABEL_COLUMN.to_string()))?;
    let mut cleaned = Table::new(table.columns().iter().map(String::as_str));
    for row in table.rows() {
        let Some(label) = row[label_idx].as_deref() else {
            continue;
        };
        let mut row = row.clone();
        row[label_idx] = Some(match label {
            "Yes" => "1".to_string(),
            "No" => "0".to_string(),
            other => other.to_string(),
        });
        cleaned.push_row(row)?;
    }
    if cleaned.n_rows() == 0 {
        return Err(SplitError::NoLabeledRows);
    }
    Ok(cleaned)
}

/// Split `0..labels.len()` into `(rest, held_out)` index sets, stratified on
/// the label. Per class, `round(n * held_out_fraction)` members go to the
/// held-out side (at least 1, at most `n - 1`). Returned index lists are
/// sorted so partitions keep the input row order.
pub fn stratified_indices(
    labels: &[&str],
    held_out_fraction: f64,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }
    let mut rest = Vec::new();
    let mut held_out = Vec::new();
    for (class, mut indices) in by_class {
        let n = indices.len();
        if n < 2 {
            return Err(SplitError::ClassTooSmall {
                class: class.to_string(),
                count: n,
            });
        }
        let held = ((n as f64) * held_out_fraction).round() as usize;
        let held = held.clamp(1, n - 1);
        indices.shuffle(rng);
        held_out.extend(indices.drain(..held));
        rest.extend(indices);
    }
    rest.sort_unstable();
    held_out.sort_unstable();
    Ok((rest, held_out))
}

/// Partition a labeled table into train/val/test with stratification on the
/// label column. `clean_labels` is applied first.
pub fn split_dataset(table: &Table, seed: u64) -> Result<Partitions, SplitError> {
    let cleaned = clean_labels(table)?;
    let label_idx = cleaned
        .column_index(LABEL_COLUMN)
        .ok_or_else(|| SplitError::MissingLabelColumn(LABEL_COLUMN.to_string()))?;
    let labels: Vec<&str> = cleaned
        .rows()
        .iter()
        .map(|row| row[label_idx].as_deref().unwrap_or(""))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let (train_idx, temp_idx) = stratified_indices(&labels, TEMP_FRACTION, &mut rng)?;
    let temp_labels: Vec<&str> = temp_idx.iter().map(|&i| labels[i]).collect();
    let (val_local, test_local) =
        stratified_indices(&temp_labels, TEST_FRACTION_OF_TEMP, &mut rng)?;
    let val_idx: Vec<usize> = val_local.iter().map(|&i| temp_idx[i]).collect();
    let test_idx: Vec<usize> = test_local.iter().map(|&i| temp_idx[i]).collect();

    Ok(Partitions {
        train: cleaned.take_rows(&train_idx),
        val: cleaned.take_rows(&val_idx),
        test: cleaned.take_rows(&test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn labeled_table(rows: &[(&str, Option<&str>)]) -> Table {
        let mut t = Table::new(["CustomerID", LABEL_COLUMN]);
        for (id, label) in rows {
            t.push_row(vec![
                Some(id.to_string()),
                label.map(str::to_string),
            ])
            .unwrap();
        }
        t
    }

    fn bulk_table(zeros: usize, ones: usize) -> Table {
        let mut rows = Vec::new();
        let ids: Vec<String> = (0..zeros + ones).map(|i| format!("c{i}")).collect();
        for (i, id) in ids.iter().enumerate() {
            rows.push((id.as_str(), Some(if i < zeros { "0" } else { "1" })));
        }
        labeled_table(&rows)
    }

    #[test]
    fn null_labels_are_dropped_and_yes_no_mapped() {
        let table = labeled_table(&[
            ("a", Some("Yes")),
            ("b", Some("No")),
            ("c", None),
            ("d", Some("maybe")),
        ]);
        let cleaned = clean_labels(&table).unwrap();
        assert_eq!(cleaned.n_rows(), 3);
        assert_eq!(cleaned.cell(0, 1), Some("1"));
        assert_eq!(cleaned.cell(1, 1), Some("0"));
        // Unrecognized textual labels pass through unchanged.
        assert_eq!(cleaned.cell(2, 1), Some("maybe"));
    }

    #[test]
    fn partition_sizes_sum_to_input() {
        let table = bulk_table(70, 30);
        let parts = split_dataset(&table, SPLIT_SEED).unwrap();
        assert_eq!(
            parts.train.n_rows() + parts.val.n_rows() + parts.test.n_rows(),
            100
        );
        // 70/20/10 within integer rounding.
        assert_eq!(parts.train.n_rows(), 70);
        assert!(parts.val.n_rows() >= 18 && parts.val.n_rows() <= 22);
        assert!(parts.test.n_rows() >= 8 && parts.test.n_rows() <= 12);
    }

    #[test]
    fn partitions_preserve_class_proportions() {
        let table = bulk_table(200, 100);
        let parts = split_dataset(&table, SPLIT_SEED).unwrap();
        for part in [&parts.train, &parts.val, &parts.test] {
            let label_idx = part.column_index(LABEL_COLUMN).unwrap();
            let ones = part
                .rows()
                .iter()
                .filter(|r| r[label_idx].as_deref() == Some("1"))
                .count();
            let frac = ones as f64 / part.n_rows() as f64;
            assert!(
                (frac - 1.0 / 3.0).abs() < 0.05,
                "class-1 fraction {frac} drifted from source proportions"
            );
        }
    }

    #[test]
    fn splitting_is_byte_identical_across_runs() {
        let table = bulk_table(40, 20);
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        split_dataset(&table, SPLIT_SEED)
            .unwrap()
            .write(dir_a.path())
            .unwrap();
        split_dataset(&table, SPLIT_SEED)
            .unwrap()
            .write(dir_b.path())
            .unwrap();
        for (a, b) in Partitions::paths(dir_a.path())
            .iter()
            .zip(Partitions::paths(dir_b.path()).iter())
        {
            let bytes_a = std::fs::read(a).unwrap();
            let bytes_b = std::fs::read(b).unwrap();
            assert_eq!(bytes_a, bytes_b);
        }
    }

    #[test]
    fn class_with_single_member_is_fatal() {
        let table = labeled_table(&[("a", Some("0")), ("b", Some("0")), ("c", Some("1"))]);
        let err = split_dataset(&table, SPLIT_SEED).unwrap_err();
        assert!(matches!(
            err,
            SplitError::ClassTooSmall { count: 1, .. }
        ));
    }

    #[test]
    fn partitions_round_trip_through_csv() {
        let table = bulk_table(20, 10);
        let parts = split_dataset(&table, SPLIT_SEED).unwrap();
        let dir = tempdir().unwrap();
        parts.write(dir.path()).unwrap();
        let loaded = Partitions::read(dir.path()).unwrap();
        assert_eq!(loaded.train, parts.train);
        assert_eq!(loaded.val, parts.val);
        assert_eq!(loaded.test, parts.test);
    }
}
