//! Train the classifier candidates and publish the best artifact bundle.

use std::path::PathBuf;

use credit_risk::trainer::{TrainConfig, train_and_publish};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = TrainConfig::new(options.data_dir, options.artifacts);
    if let Some(rounds) = options.rounds {
        config.gbdt.rounds = rounds;
    }
    if let Some(learning_rate) = options.learning_rate {
        config.gbdt.learning_rate = learning_rate;
    }
    if let Some(epochs) = options.epochs {
        config.logreg.epochs = epochs;
    }

    let outcome = train_and_publish(&config).map_err(|err| err.to_string())?;

    for report in &outcome.reports {
        println!("\n=== {} ===", report.name);
        println!("test ROC-AUC: {:.4}", report.test_auc);
        println!("test accuracy: {:.4}", report.accuracy);
        for (class, stats) in ["good (0)", "bad (1)"].iter().zip(report.per_class.iter()) {
            println!(
                "class {:<9} precision={:.3}  recall={:.3}  support={}",
                class, stats.precision, stats.recall, stats.support
            );
        }
        let cm = &report.confusion;
        println!("confusion matrix (rows=true, cols=pred):");
        println!("{:6}{:6}", cm.true_negative, cm.false_positive);
        println!("{:6}{:6}", cm.false_negative, cm.true_positive);
    }
    println!("\nselected candidate: {}", outcome.selected);
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    data_dir: PathBuf,
    artifacts: PathBuf,
    rounds: Option<usize>,
    learning_rate: Option<f64>,
    epochs: Option<usize>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut data_dir = PathBuf::from("data");
    let mut artifacts = PathBuf::from("artifacts");
    let mut rounds = None;
    let mut learning_rate = None;
    let mut epochs = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--data-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--data-dir requires a value".to_string())?;
                data_dir = PathBuf::from(value);
            }
            "--artifacts" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                artifacts = PathBuf::from(value);
            }
            "--rounds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--rounds requires a value".to_string())?;
                rounds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --rounds value: {value}"))?,
                );
            }
            "--learning-rate" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--learning-rate requires a value".to_string())?;
                learning_rate = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --learning-rate value: {value}"))?,
                );
            }
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        data_dir,
        artifacts,
        rounds,
        learning_rate,
        epochs,
    })
}

fn help_text() -> String {
    [
        "credit-risk-train",
        "",
        "Trains the gradient-boosted stump and logistic-regression candidates on the",
        "train partition, tunes against the validation partition, selects the best",
        "test ROC-AUC, and publishes the winning artifact bundle atomically.",
        "",
        "Usage:",
        "  credit-risk-train [--data-dir <dir>] [--artifacts <dir>] [options]",
        "",
        "Options:",
        "  --data-dir <dir>       Partition directory (default: data).",
        "  --artifacts <dir>      Artifact output directory (default: artifacts).",
        "  --rounds <n>           Maximum boosting rounds (default: 500).",
        "  --learning-rate <f64>  Boosting learning rate (default: 0.05).",
        "  --epochs <n>           Logistic-regression epochs (default: 50).",
    ]
    .join("\n")
}
