//! Generate a synthetic artifact bundle so the scoring service can start
//! without access to the real datasets.

use std::path::PathBuf;

use credit_risk::synthetic::{SyntheticOptions, generate_and_publish};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let (artifact_dir, options) = parse_args(std::env::args().skip(1).collect())?;
    let bundle = generate_and_publish(&artifact_dir, &options).map_err(|err| err.to_string())?;
    println!(
        "synthetic {} bundle ({} features) published to {}",
        bundle.model.name(),
        bundle.feature_names.len(),
        artifact_dir.display()
    );
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<(PathBuf, SyntheticOptions), String> {
    let mut artifact_dir = PathBuf::from("artifacts");
    let mut options = SyntheticOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--artifacts" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                artifact_dir = PathBuf::from(value);
            }
            "--rows" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--rows requires a value".to_string())?;
                options.rows = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --rows value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok((artifact_dir, options))
}

fn help_text() -> String {
    [
        "credit-risk-synthetic",
        "",
        "Trains a small logistic-regression model on generated customer rows and",
        "publishes a complete artifact bundle. Useful for local development and for",
        "bringing the scoring service up without the real training data.",
        "",
        "Usage:",
        "  credit-risk-synthetic [--artifacts <dir>] [--rows <n>] [--seed <n>]",
        "",
        "Options:",
        "  --artifacts <dir>  Artifact output directory (default: artifacts).",
        "  --rows <n>         Synthetic rows to generate (default: 500).",
        "  --seed <n>         Generator seed (default: 42).",
    ]
    .join("\n")
}
