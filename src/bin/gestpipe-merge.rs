//! Merge per-session gesture sample files into one combined JSON array.

use std::path::PathBuf;

use gestpipe::config;
use gestpipe::dataset::merge_samples;
use gestpipe::logging;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("gestpipe-merge") {
        eprintln!("Logging disabled: {err}");
    }
    let (config, _) = config::resolve(options.config.as_deref()).map_err(|err| err.to_string())?;
    let mut settings = config.merge;
    if let Some(source_dir) = options.source_dir {
        settings.source_dir = source_dir;
    }
    if let Some(output_dir) = options.output_dir {
        settings.output_dir = output_dir;
    }
    if let Some(output_file_name) = options.output_file_name {
        settings.output_file_name = output_file_name;
    }

    let summary = merge_samples(
        &settings.source_dir,
        &settings.output_dir,
        &settings.output_file_name,
    )
    .map_err(|err| err.to_string())?;
    println!(
        "Merged {} total samples from {} files into: {}",
        summary.total_samples,
        summary.merged_files.len(),
        summary.output_path.display()
    );
    if !summary.skipped.is_empty() {
        println!("Skipped {} files:", summary.skipped.len());
        for skipped in &summary.skipped {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    source_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    output_file_name: Option<String>,
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
            "--source" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--source requires a value".to_string())?;
                options.source_dir = Some(PathBuf::from(value));
            }
            "--output-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--output-dir requires a value".to_string())?;
                options.output_dir = Some(PathBuf::from(value));
            }
            "--output-name" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--output-name requires a value".to_string())?;
                options.output_file_name = Some(value.clone());
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "gestpipe-merge",
        "",
        "Concatenates every *.json sample list in a directory into one combined file.",
        "",
        "Usage:",
        "  gestpipe-merge [--config <file>] [--source <dir>] [--output-dir <dir>]",
        "",
        "Options:",
        "  --config <file>       Pipeline config (default: config.toml in the app directory).",
        "  --source <dir>        Directory of session files (default: data_collection).",
        "  --output-dir <dir>    Directory for the combined file (default: shared_results).",
        "  --output-name <name>  Combined file name (default: combined_gesture_samples.json).",
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
    fn parses_overrides() {
        let options = parse_args(args(&["--source", "in", "--output-name", "all.json"])).unwrap();
        assert_eq!(options.source_dir, Some(PathBuf::from("in")));
        assert_eq!(options.output_file_name.as_deref(), Some("all.json"));
        assert!(options.config.is_none());
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse_args(args(&["--bogus"])).unwrap_err().contains("Unknown argument"));
        assert_eq!(
            parse_args(args(&["--source"])).unwrap_err(),
            "--source requires a value"
        );
        assert!(parse_args(args(&["--help"])).unwrap_err().starts_with("gestpipe-merge"));
    }
}
