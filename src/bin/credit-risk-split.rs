//! Split the combined dataset into stratified train/val/test partitions.

use std::path::PathBuf;

use credit_risk::split::{SPLIT_SEED, split_dataset};
use credit_risk::table::Table;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let table = Table::from_csv(&options.input).map_err(|err| err.to_string())?;
    println!("loaded {} rows", table.n_rows());

    let partitions = split_dataset(&table, options.seed).map_err(|err| err.to_string())?;
    partitions
        .write(&options.out_dir)
        .map_err(|err| err.to_string())?;
    println!(
        "partitions written under {} (train: {}, val: {}, test: {})",
        options.out_dir.display(),
        partitions.train.n_rows(),
        partitions.val.n_rows(),
        partitions.test.n_rows()
    );
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    input: PathBuf,
    out_dir: PathBuf,
    seed: u64,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut input: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from("data");
    let mut seed = SPLIT_SEED;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--out-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--out-dir requires a value".to_string())?;
                out_dir = PathBuf::from(value);
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let input = input.ok_or_else(help_text)?;
    Ok(CliOptions {
        input,
        out_dir,
        seed,
    })
}

fn help_text() -> String {
    [
        "credit-risk-split",
        "",
        "Splits a labeled dataset into stratified train (70%) / val (20%) / test (10%)",
        "partitions. Rows without a label are dropped first; the split is deterministic",
        "for a given seed.",
        "",
        "Usage:",
        "  credit-risk-split --input <csv> [--out-dir <dir>] [--seed <n>]",
        "",
        "Options:",
        "  --input <csv>    Combined unified-schema dataset (required).",
        "  --out-dir <dir>  Output directory (default: data).",
        "  --seed <n>       Split seed (default: 42).",
    ]
    .join("\n")
}
