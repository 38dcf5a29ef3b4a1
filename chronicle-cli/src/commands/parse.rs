//! Parse command - flatten a ChatGPT export into linear transcripts

use std::path::PathBuf;

use anyhow::{Context, Result};
use chronicle_core::{parse_export_file, resolve_export_path, ChronicleConfig, ChronicleError};
use clap::Parser;
use tracing::{error, info};

use crate::ui;

#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Unzipped export folder or its conversations.json
    #[arg(value_name = "EXPORT_PATH")]
    pub input: PathBuf,

    /// Output file (default: chatgpt_conversations.json, or [parse] output_file)
    #[arg(long = "out", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub fn run_parse(args: ParseArgs, config: &ChronicleConfig) -> Result<()> {
    let input = resolve_export_path(&args.input);
    let output = args
        .output
        .unwrap_or_else(|| config.parse.output_file.clone());

    info!("parsing export {:?} -> {:?}", input, output);

    let pb = ui::spinner(format!("Flattening {}", input.display()));
    let report = match parse_export_file(&input, &output) {
        Ok(report) => report,
        Err(err) => {
            ui::finish_error(pb, "Parse failed");
            if let ChronicleError::WriteFailure { .. } = err {
                error!("{}", err);
            }
            return Err(err).with_context(|| format!("failed to parse export {}", input.display()));
        }
    };

    ui::finish_success(
        pb,
        format!(
            "Wrote {} conversations to {}",
            report.emitted,
            output.display()
        ),
    );

    if report.skipped_non_object > 0 || report.dropped_empty > 0 {
        info!(
            "{} entries skipped, {} empty conversations dropped",
            report.skipped_non_object, report.dropped_empty
        );
    }
    info!(
        "Successfully parsed {} conversations to '{}'",
        report.emitted,
        output.display()
    );

    Ok(())
}
