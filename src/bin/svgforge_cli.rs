//! SvgForge CLI - JSON bridge to the document engine
//!
//! Commands: validate, optimize, transform, process, metadata
//! Outputs JSON to stdout
//! Returns 2 on validation failure, 1 on bad input

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{debug, error, LevelFilter};
use serde::Serialize;
use serde_json::Value;

use svgforge_core::{
    ConfigurationError, Document, EngineConfig, OptimizationPreset, Pipeline, PipelineError,
    ProcessRequest, ScoredValidation, Transformation, ValidationPreset,
};

/// Exit status for a document that failed validation
const EXIT_INVALID: u8 = 2;

#[derive(Parser)]
#[command(name = "svgforge-cli")]
#[command(about = "SvgForge CLI - validate, optimize and transform SVG documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document and print the scored report
    Validate {
        /// JSON payload (Document)
        #[arg(short, long)]
        payload: String,

        /// Validation preset
        #[arg(long)]
        preset: Option<String>,
    },

    /// Optimize a document
    Optimize {
        /// JSON payload (Document)
        #[arg(short, long)]
        payload: String,

        /// Optimization preset
        #[arg(long)]
        preset: Option<String>,
    },

    /// Apply a sequence of transformations
    Transform {
        /// JSON payload (Document)
        #[arg(short, long)]
        payload: String,

        /// JSON array of transformations
        #[arg(short, long)]
        operations: String,
    },

    /// Run the full pipeline
    Process {
        /// JSON payload (ProcessRequest)
        #[arg(short, long)]
        payload: String,
    },

    /// Print document metadata
    Metadata {
        /// JSON payload (Document)
        #[arg(short, long)]
        payload: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Warn);
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(&e.to_string()),
        },
        None => EngineConfig::default(),
    };
    debug!(config:?; "Using engine configuration");

    let pipeline = Pipeline::new(config);

    match run(&pipeline, cli.command) {
        Ok((output, status)) => {
            print_json(&output);
            ExitCode::from(status)
        }
        Err(PipelineError::ValidationFailed { errors, warnings }) => {
            print_json(&serde_json::json!({
                "success": false,
                "errors": errors,
                "warnings": warnings,
            }));
            ExitCode::from(EXIT_INVALID)
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn run(pipeline: &Pipeline, command: Commands) -> Result<(Value, u8), PipelineError> {
    let output = match command {
        Commands::Validate { payload, preset } => {
            let document: Document = parse(&payload)?;
            let preset = match preset {
                Some(name) => parse_preset::<ValidationPreset>(&name)?,
                None => pipeline.config().validation,
            };
            return validation_output(&pipeline.validate_document(&document, &preset.options()));
        }

        Commands::Optimize { payload, preset } => {
            let document: Document = parse(&payload)?;
            let preset = match preset {
                Some(name) => parse_preset::<OptimizationPreset>(&name)?,
                None => pipeline.config().optimization,
            };
            to_value(&pipeline.optimize_document(&document, &preset.options())?)?
        }

        Commands::Transform { payload, operations } => {
            let document: Document = parse(&payload)?;
            let operations: Value = parse(&operations)?;
            let steps = operations
                .as_array()
                .ok_or_else(|| ConfigurationError::Invalid("operations must be a JSON array".into()))?
                .iter()
                .map(Transformation::from_value)
                .collect::<Result<Vec<_>, _>>()?;
            to_value(&pipeline.transform_multiple(&document, &steps)?)?
        }

        Commands::Process { payload } => {
            let request = ProcessRequest::from_value(parse(&payload)?)?;
            let processed = pipeline.process_document(&request)?;
            serde_json::json!({
                "success": true,
                "result": processed,
            })
        }

        Commands::Metadata { payload } => {
            let document: Document = parse(&payload)?;
            to_value(&pipeline.generate_metadata(&document)?)?
        }
    };
    Ok((output, 0))
}

/// The full scored report, whether or not the document is valid
fn validation_output(result: &ScoredValidation) -> Result<(Value, u8), PipelineError> {
    let output = serde_json::json!({
        "success": result.valid,
        "result": to_value(result)?,
    });
    let status = if result.valid { 0 } else { EXIT_INVALID };
    Ok((output, status))
}

fn parse<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, ConfigurationError> {
    serde_json::from_str(payload).map_err(|e| ConfigurationError::Invalid(format!("Invalid payload: {e}")))
}

fn parse_preset<T: serde::de::DeserializeOwned>(name: &str) -> Result<T, ConfigurationError> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| ConfigurationError::Invalid(format!("Unknown preset: {name}")))
}

fn to_value(value: &impl Serialize) -> Result<Value, PipelineError> {
    Ok(serde_json::to_value(value)?)
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("Failed to print output: {e}"),
    }
}

fn fail(message: &str) -> ExitCode {
    print_json(&serde_json::json!({
        "success": false,
        "error": message,
    }));
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgforge_core::{Attributes, Element, ViewBox};

    #[test]
    fn test_invalid_document_keeps_full_report() {
        let document = Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![
                Element::circle(10.0, 10.0, -1.0),
                Element::group(vec![]).with_attrs(Attributes::with_id("unused")),
            ],
        );
        let pipeline = Pipeline::default();
        let result = pipeline.validate_document(&document, &ValidationPreset::Standard.options());

        let (output, status) = validation_output(&result).unwrap();
        assert_eq!(status, EXIT_INVALID);
        assert_eq!(output["success"], Value::Bool(false));

        let report = &output["result"]["report"];
        assert_eq!(report["errors"][0]["code"], "INVALID_RADIUS");
        let warnings: Vec<&str> = report["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|w| w["code"].as_str())
            .collect();
        assert!(warnings.contains(&"EMPTY_GROUP"));
        assert!(warnings.contains(&"UNREFERENCED_ID"));
        assert!(report["accessibility"].is_object());
        assert!(output["result"]["score"].as_f64().unwrap() < 100.0);
    }

    #[test]
    fn test_valid_document_exits_cleanly() {
        let document = Document::new(
            ViewBox::new(0.0, 0.0, 100.0, 100.0),
            vec![Element::circle(10.0, 10.0, 5.0)],
        );
        let result = Pipeline::default().validate_document(&document, &ValidationPreset::Minimal.options());
        let (output, status) = validation_output(&result).unwrap();
        assert_eq!(status, 0);
        assert_eq!(output["success"], Value::Bool(true));
    }
}
