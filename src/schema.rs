//! Unified schema and per-source rename tables for dataset merging.
//!
//! Each raw dataset arrives with its own column names. A [`SourceSpec`]
//! declares how a source maps onto the unified layout; renames whose source
//! column is absent are skipped rather than failed, because the inputs are
//! known to be only partially compatible.

use thiserror::Error;
use tracing::debug;

use crate::table::{Table, TableError};

/// The canonical column layout every merged record is projected onto.
/// `Default` is the binary label (0 = no default, 1 = default, null =
/// unlabeled).
pub const UNIFIED_COLUMNS: [&str; 38] = [
    "CustomerID",
    "Age",
    "Gender",
    "Income",
    "Savings",
    "Debt",
    "LoanAmount",
    "CreditScore",
    "MonthsEmployed",
    "NumCreditLines",
    "InterestRate",
    "LoanTerm",
    "DTIRatio",
    "Education",
    "EmploymentType",
    "MaritalStatus",
    "HasMortgage",
    "HasDependents",
    "LoanPurpose",
    "HasCoSigner",
    "LTV",
    "Region",
    "Spending_Clothing",
    "Spending_Education",
    "Spending_Entertainment",
    "Spending_Gambling",
    "Spending_Groceries",
    "Spending_Health",
    "Spending_Housing",
    "Spending_Tax",
    "Spending_Travel",
    "Spending_Utilities",
    "CAT_Gambling",
    "CAT_Debt",
    "CAT_CreditCard",
    "CAT_Mortgage",
    "CAT_SavingsAccount",
    "Default",
];

/// Declarative description of one input dataset: a display name and the
/// rename pairs `(source column, unified column)` that apply to it.
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec<'a> {
    pub name: &'a str,
    pub renames: &'a [(&'a str, &'a str)],
}

/// Spending/behavior dataset (`credit_score.csv`).
pub const CREDIT_SCORE_SOURCE: SourceSpec<'static> = SourceSpec {
    name: "credit_score",
    renames: &[
        ("CUST_ID", "CustomerID"),
        ("INCOME", "Income"),
        ("SAVINGS", "Savings"),
        ("DEBT", "Debt"),
        ("CREDIT_SCORE", "CreditScore"),
        ("DEFAULT", "Default"),
    ],
};

/// Loan application dataset (`Loan_default.csv`).
pub const LOAN_DEFAULT_SOURCE: SourceSpec<'static> = SourceSpec {
    name: "loan_default",
    renames: &[
        ("ID", "CustomerID"),
        ("income", "Income"),
        ("Credit_Score", "CreditScore"),
        ("loan_amount", "LoanAmount"),
        ("dtir1", "DTIRatio"),
        ("Status", "Default"),
    ],
};

/// Simple loan dataset (`Loan.csv`).
pub const LOAN_SOURCE: SourceSpec<'static> = SourceSpec {
    name: "loan",
    renames: &[
        ("LoanID", "CustomerID"),
        ("Age", "Age"),
        ("Income", "Income"),
        ("LoanAmount", "LoanAmount"),
        ("CreditScore", "CreditScore"),
        ("DTIRatio", "DTIRatio"),
        ("Default", "Default"),
    ],
};

/// Errors from schema unification.
#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("no input sources supplied")]
    NoSources,
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Apply a source's renames to a raw table. Renames whose source column is
/// missing are skipped with a debug log; the unified column they would have
/// produced ends up null after projection.
pub fn apply_renames(table: &mut Table, spec: &SourceSpec<'_>) {
    for (from, to) in spec.renames {
        if !table.rename_column(from, to) {
            debug!(
                source = spec.name,
                column = from,
                "rename source column missing, skipping"
            );
        }
    }
}

/// Merge raw source tables into one table with exactly the
/// [`UNIFIED_COLUMNS`] layout. Row order is preserved within each source and
/// sources are concatenated in the order given. No deduplication and no
/// value validation.
pub fn unify(sources: Vec<(SourceSpec<'_>, Table)>) -> Result<Table, UnifyError> {
    if sources.is_empty() {
        return Err(UnifyError::NoSources);
    }
    let mut combined = Table::new(UNIFIED_COLUMNS);
    for (spec, mut table) in sources {
        apply_renames(&mut table, &spec);
        let projected = table.project(&UNIFIED_COLUMNS);
        debug!(
            source = spec.name,
            rows = projected.n_rows(),
            "projected source onto unified schema"
        );
        combined.append(projected)?;
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_a() -> Table {
        let mut t = Table::new(["CUST_ID", "INCOME", "DEFAULT", "Noise"]);
        t.push_row(vec![
            Some("c1".into()),
            Some("1000".into()),
            Some("0".into()),
            Some("junk".into()),
        ])
        .unwrap();
        t
    }

    fn source_b() -> Table {
        let mut t = Table::new(["LoanID", "Income", "Default"]);
        t.push_row(vec![
            Some("l1".into()),
            Some("2000".into()),
            Some("1".into()),
        ])
        .unwrap();
        t.push_row(vec![Some("l2".into()), None, None]).unwrap();
        t
    }

    #[test]
    fn unified_output_has_exact_columns_in_order() {
        let merged = unify(vec![
            (CREDIT_SCORE_SOURCE, source_a()),
            (LOAN_SOURCE, source_b()),
        ])
        .unwrap();
        assert_eq!(merged.columns(), UNIFIED_COLUMNS);
        assert_eq!(merged.n_rows(), 3);
    }

    #[test]
    fn source_order_determines_row_order() {
        let ab = unify(vec![
            (CREDIT_SCORE_SOURCE, source_a()),
            (LOAN_SOURCE, source_b()),
        ])
        .unwrap();
        let ba = unify(vec![
            (LOAN_SOURCE, source_b()),
            (CREDIT_SCORE_SOURCE, source_a()),
        ])
        .unwrap();
        assert_eq!(ab.columns(), ba.columns());
        assert_eq!(ab.cell(0, 0), Some("c1"));
        assert_eq!(ba.cell(0, 0), Some("l1"));
    }

    #[test]
    fn missing_rename_source_is_tolerated() {
        // LOAN_DEFAULT_SOURCE expects "Status" etc.; none of them exist here.
        let mut t = Table::new(["Unrelated"]);
        t.push_row(vec![Some("x".into())]).unwrap();
        let merged = unify(vec![(LOAN_DEFAULT_SOURCE, t)]).unwrap();
        assert_eq!(merged.n_rows(), 1);
        let label_idx = merged.column_index("Default").unwrap();
        assert_eq!(merged.cell(0, label_idx), None);
    }

    #[test]
    fn unmodeled_columns_are_dropped() {
        let merged = unify(vec![(CREDIT_SCORE_SOURCE, source_a())]).unwrap();
        assert!(merged.column_index("Noise").is_none());
        let income_idx = merged.column_index("Income").unwrap();
        assert_eq!(merged.cell(0, income_idx), Some("1000"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(unify(Vec::new()), Err(UnifyError::NoSources)));
    }
}
