//! Build the evaluation report (summary text and charts) from the prediction CSV.

use std::path::PathBuf;

use gestpipe::config;
use gestpipe::logging;
use gestpipe::report::{ReportError, generate_report};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("gestpipe-report") {
        eprintln!("Logging disabled: {err}");
    }
    let (config, _) = config::resolve(options.config.as_deref()).map_err(|err| err.to_string())?;
    let mut settings = config.report;
    if let Some(path) = options.csv_path {
        settings.csv_path = path;
    }
    if let Some(path) = options.output_dir {
        settings.output_dir = path;
    }
    if let Some(top) = options.top {
        settings.top_misclassifications = top;
    }

    match generate_report(&settings) {
        Ok(outputs) => {
            println!(
                "Report for {} rows written to '{}'",
                outputs.rows,
                settings.output_dir.display()
            );
            Ok(())
        }
        // A missing input is reported but is not a failure of the run.
        Err(err @ ReportError::MissingCsv { .. }) => {
            println!("Error: {err}");
            Ok(())
        }
        Err(err) => Err(err.to_string()),
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    csv_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    top: Option<usize>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--csv" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--csv requires a value".to_string())?;
                options.csv_path = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.output_dir = Some(PathBuf::from(value));
            }
            "--top" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--top requires a value".to_string())?;
                options.top = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --top value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "gestpipe-report",
        "",
        "Writes summary_report.txt, confusion_matrix.png, roc_curves.png and",
        "probability_distributions.png from the prediction CSV.",
        "",
        "Usage:",
        "  gestpipe-report [--config <file>] [--csv <file>] [--out <dir>] [--top <n>]",
        "",
        "Options:",
        "  --config <file>   Pipeline config (default: config.toml in the app directory).",
        "  --csv <file>      Prediction CSV (default: evaluation_results.csv).",
        "  --out <dir>       Output directory (default: evaluation_plots).",
        "  --top <n>         Misclassification pairs to list (default 5)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_report_flags() {
        let options = parse_args(args(&["--csv", "r.csv", "--top", "3"])).unwrap();
        assert_eq!(options.csv_path, Some(PathBuf::from("r.csv")));
        assert_eq!(options.top, Some(3));
        assert_eq!(
            parse_args(args(&["--top", "x"])).unwrap_err(),
            "Invalid --top value: x"
        );
    }

    #[test]
    fn usage_lists_every_flag() {
        let help = parse_args(args(&["--help"])).unwrap_err();
        let usage = help
            .lines()
            .find(|line| line.trim_start().starts_with("gestpipe-report ["))
            .unwrap();
        for flag in ["--config", "--csv", "--out", "--top"] {
            assert!(usage.contains(flag), "usage misses {flag}");
        }
    }
}
