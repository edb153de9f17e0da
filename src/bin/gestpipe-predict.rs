//! Score labeled evaluation samples with the exported model and write the probability CSV.

use std::path::PathBuf;

use gestpipe::config;
use gestpipe::logging;
use gestpipe::prediction::export_predictions;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("gestpipe-predict") {
        eprintln!("Logging disabled: {err}");
    }
    let (config, _) = config::resolve(options.config.as_deref()).map_err(|err| err.to_string())?;
    let mut settings = config.predict;
    if let Some(path) = options.model_dir {
        settings.model_dir = path;
    }
    if let Some(path) = options.label_mapping_path {
        settings.label_mapping_path = path;
    }
    if let Some(path) = options.samples_path {
        settings.samples_path = path;
    }
    if let Some(path) = options.output_csv {
        settings.output_csv = path;
    }

    let summary = export_predictions(&settings).map_err(|err| err.to_string())?;
    println!(
        "Wrote {} rows over {} classes to {}",
        summary.rows,
        summary.classes.len(),
        summary.output_csv.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    label_mapping_path: Option<PathBuf>,
    samples_path: Option<PathBuf>,
    output_csv: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        let slot = match flag {
            "-h" | "--help" => return Err(help_text()),
            "--config" => &mut options.config,
            "--model-dir" => &mut options.model_dir,
            "--mapping" => &mut options.label_mapping_path,
            "--samples" => &mut options.samples_path,
            "--out" => &mut options.output_csv,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        };
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        *slot = Some(PathBuf::from(value));
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "gestpipe-predict",
        "",
        "Runs the exported model over labeled samples and writes TrueLabel,Prob_<class> rows.",
        "",
        "Usage:",
        "  gestpipe-predict [--config <file>] [--samples <file>] [--out <file>]",
        "",
        "Options:",
        "  --config <file>     Pipeline config (default: config.toml in the app directory).",
        "  --model-dir <dir>   Exported model directory (default: gesture_model_tfjs).",
        "  --mapping <file>    Label mapping (default: label_mapping.json).",
        "  --samples <file>    Labeled samples to score (default: final_eval_data.json).",
        "  --out <file>        Output CSV (default: evaluation_results.csv).",
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
    fn parses_paths() {
        let options = parse_args(args(&["--out", "o.csv", "--model-dir", "m"])).unwrap();
        assert_eq!(options.output_csv, Some(PathBuf::from("o.csv")));
        assert_eq!(options.model_dir, Some(PathBuf::from("m")));
        assert!(parse_args(args(&["--out"])).is_err());
    }
}
