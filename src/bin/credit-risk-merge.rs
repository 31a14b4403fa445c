//! Merge the three raw datasets into one unified-schema CSV.

use std::path::PathBuf;

use credit_risk::schema::{
    CREDIT_SCORE_SOURCE, LOAN_DEFAULT_SOURCE, LOAN_SOURCE, SourceSpec, unify,
};
use credit_risk::table::Table;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut sources: Vec<(SourceSpec<'_>, Table)> = Vec::new();
    for (spec, path) in [
        (CREDIT_SCORE_SOURCE, &options.credit_score),
        (LOAN_DEFAULT_SOURCE, &options.loan_default),
        (LOAN_SOURCE, &options.loan),
    ] {
        let Some(path) = path else { continue };
        let table = Table::from_csv(path).map_err(|err| err.to_string())?;
        println!("loaded {}: {} rows", spec.name, table.n_rows());
        sources.push((spec, table));
    }
    if sources.is_empty() {
        return Err(format!("No input datasets given.\n\n{}", help_text()));
    }

    let combined = unify(sources).map_err(|err| err.to_string())?;
    combined.to_csv(&options.out).map_err(|err| err.to_string())?;
    println!(
        "combined dataset written to {} ({} rows x {} columns)",
        options.out.display(),
        combined.n_rows(),
        combined.columns().len()
    );
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    credit_score: Option<PathBuf>,
    loan_default: Option<PathBuf>,
    loan: Option<PathBuf>,
    out: PathBuf,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut credit_score = None;
    let mut loan_default = None;
    let mut loan = None;
    let mut out = PathBuf::from("combined_credit_data.csv");

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--credit-score" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--credit-score requires a value".to_string())?;
                credit_score = Some(PathBuf::from(value));
            }
            "--loan-default" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--loan-default requires a value".to_string())?;
                loan_default = Some(PathBuf::from(value));
            }
            "--loan" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--loan requires a value".to_string())?;
                loan = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = PathBuf::from(value);
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        credit_score,
        loan_default,
        loan,
        out,
    })
}

fn help_text() -> String {
    [
        "credit-risk-merge",
        "",
        "Merges the raw credit datasets into one unified-schema CSV.",
        "Sources are concatenated in the fixed order: credit-score, loan-default, loan.",
        "",
        "Usage:",
        "  credit-risk-merge [--credit-score <csv>] [--loan-default <csv>] [--loan <csv>] [--out <csv>]",
        "",
        "Options:",
        "  --credit-score <csv>  Spending/behavior dataset (credit_score.csv).",
        "  --loan-default <csv>  Loan application dataset (Loan_default.csv).",
        "  --loan <csv>          Simple loan dataset (Loan.csv).",
        "  --out <csv>           Output path (default: combined_credit_data.csv).",
    ]
    .join("\n")
}
