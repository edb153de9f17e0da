//! Train the gesture classifier on the combined sample set and export it for the browser.

use std::path::PathBuf;
use std::str::FromStr;

use gestpipe::config::{self, TrainSettings};
use gestpipe::logging;
use gestpipe::training::train_from_config;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("gestpipe-train") {
        eprintln!("Logging disabled: {err}");
    }
    let (mut config, source) =
        config::resolve(options.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(path) = &source {
        println!("Using config {}", path.display());
    }
    options.apply(&mut config.train);
    let config = config.normalized();
    if let Some(path) = &options.save_config {
        config::save_to_path(&config, path).map_err(|err| err.to_string())?;
        println!("Saved effective config to {}", path.display());
    }

    let summary = train_from_config(&config.train).map_err(|err| err.to_string())?;
    println!(
        "Trained on {} samples ({} held out) across {} classes",
        summary.train_rows,
        summary.held_out_rows,
        summary.classes.len()
    );
    if let Some(last) = summary.history.last() {
        print!("final epoch: loss={:.4} accuracy={:.4}", last.loss, last.accuracy);
        if let (Some(val_loss), Some(val_accuracy)) = (last.val_loss, last.val_accuracy) {
            print!(" val_loss={val_loss:.4} val_accuracy={val_accuracy:.4}");
        }
        println!();
    }
    if let Some(scores) = &summary.held_out {
        println!("held-out accuracy: {:.4}", scores.accuracy);
        println!("confusion matrix (rows=true, cols=pred):");
        for truth in 0..scores.confusion.n_classes {
            let mut row = format!("{:<16}", summary.classes[truth]);
            for pred in 0..scores.confusion.n_classes {
                row.push_str(&format!("{:6}", scores.confusion.get(truth, pred)));
            }
            println!("{row}");
        }
    }
    println!("Label mapping: {}", summary.label_mapping_path.display());
    println!("Model: {}", summary.model_path.display());
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    save_config: Option<PathBuf>,
    samples_path: Option<PathBuf>,
    label_mapping_path: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    input_width: Option<usize>,
    hidden_units: Option<usize>,
    hidden_layers: Option<usize>,
    dropout: Option<f32>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    learning_rate: Option<f32>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
}

impl CliOptions {
    fn apply(&self, settings: &mut TrainSettings) {
        if let Some(path) = &self.samples_path {
            settings.samples_path = path.clone();
        }
        if let Some(path) = &self.label_mapping_path {
            settings.label_mapping_path = path.clone();
        }
        if let Some(path) = &self.model_dir {
            settings.model_dir = path.clone();
        }
        settings.input_width = self.input_width.unwrap_or(settings.input_width);
        settings.hidden_units = self.hidden_units.unwrap_or(settings.hidden_units);
        settings.hidden_layers = self.hidden_layers.unwrap_or(settings.hidden_layers);
        settings.dropout = self.dropout.unwrap_or(settings.dropout);
        settings.epochs = self.epochs.unwrap_or(settings.epochs);
        settings.batch_size = self.batch_size.unwrap_or(settings.batch_size);
        settings.learning_rate = self.learning_rate.unwrap_or(settings.learning_rate);
        settings.test_fraction = self.test_fraction.unwrap_or(settings.test_fraction);
        settings.seed = self.seed.unwrap_or(settings.seed);
    }
}

fn take_value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_value<T: FromStr>(args: &[String], idx: &mut usize, flag: &str) -> Result<T, String> {
    let value = take_value(args, idx, flag)?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Err(help_text()),
            "--config" => options.config = Some(take_value(&args, &mut idx, flag)?.into()),
            "--save-config" => {
                options.save_config = Some(take_value(&args, &mut idx, flag)?.into())
            }
            "--samples" => options.samples_path = Some(take_value(&args, &mut idx, flag)?.into()),
            "--mapping" => {
                options.label_mapping_path = Some(take_value(&args, &mut idx, flag)?.into())
            }
            "--model-dir" => options.model_dir = Some(take_value(&args, &mut idx, flag)?.into()),
            "--input-width" => options.input_width = Some(parse_value(&args, &mut idx, flag)?),
            "--hidden" => options.hidden_units = Some(parse_value(&args, &mut idx, flag)?),
            "--layers" => options.hidden_layers = Some(parse_value(&args, &mut idx, flag)?),
            "--dropout" => options.dropout = Some(parse_value(&args, &mut idx, flag)?),
            "--epochs" => options.epochs = Some(parse_value(&args, &mut idx, flag)?),
            "--batch" => options.batch_size = Some(parse_value(&args, &mut idx, flag)?),
            "--learning-rate" => options.learning_rate = Some(parse_value(&args, &mut idx, flag)?),
            "--test-fraction" => options.test_fraction = Some(parse_value(&args, &mut idx, flag)?),
            "--seed" => options.seed = Some(parse_value(&args, &mut idx, flag)?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "gestpipe-train",
        "",
        "Trains the dense gesture classifier and exports a TensorFlow.js layers model.",
        "",
        "Usage:",
        "  gestpipe-train [--config <file>] [--samples <file>] [--model-dir <dir>]",
        "",
        "Options:",
        "  --config <file>         Pipeline config (default: config.toml in the app directory).",
        "  --save-config <file>    Write the effective config (after flags) to <file>.",
        "  --samples <file>        Combined sample set",
        "                          (default: shared_results/combined_gesture_samples.json).",
        "  --mapping <file>        Label mapping output (default: label_mapping.json).",
        "  --model-dir <dir>       Model output directory (default: gesture_model_tfjs).",
        "  --input-width <n>       Required vector length (default 42)",
        "  --hidden <n>            Units per hidden layer (default 64)",
        "  --layers <n>            Hidden layers (default 2)",
        "  --dropout <f>           Dropout after each hidden layer (default 0.2)",
        "  --epochs <n>            Training epochs (default 30)",
        "  --batch <n>             Batch size (default 32)",
        "  --learning-rate <f>     Adam learning rate (default 0.001)",
        "  --test-fraction <f>     Held-out fraction (default 0.2)",
        "  --seed <n>              RNG seed (default 42)",
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
    fn flags_override_settings() {
        let options =
            parse_args(args(&["--epochs", "5", "--dropout", "0.1", "--samples", "x.json"]))
                .unwrap();
        let mut settings = TrainSettings::default();
        options.apply(&mut settings);
        assert_eq!(settings.epochs, 5);
        assert!((settings.dropout - 0.1).abs() < 1e-6);
        assert_eq!(settings.samples_path, PathBuf::from("x.json"));
        assert_eq!(settings.batch_size, 32);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        assert_eq!(
            parse_args(args(&["--epochs", "many"])).unwrap_err(),
            "Invalid --epochs value: many"
        );
        assert_eq!(
            parse_args(args(&["--seed"])).unwrap_err(),
            "--seed requires a value"
        );
    }
}
