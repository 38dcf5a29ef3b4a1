//! Drive command - recent Google Drive activity and Google Doc export
//!
//! Credentials: `GOOGLE_DRIVE_ACCESS_TOKEN` wins when set; otherwise the
//! authorized-user token file (`--token`, default token.json) is used and
//! refreshed in place when expired.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use chronicle_core::ChronicleConfig;
use chronicle_drive::{
    first_google_doc, preview, write_activity, AuthorizedUserProvider, CredentialProvider,
    DriveClient, DriveError, DriveFile, StaticToken,
};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use crate::ui;

/// Characters of document text shown by `drive fetch`.
const FETCH_PREVIEW_CHARS: usize = 500;

#[derive(Parser, Debug)]
pub struct DriveArgs {
    /// Authorized-user token file (default: token.json, or [drive] token_file)
    #[arg(long, global = true, value_name = "PATH")]
    pub token: Option<PathBuf>,

    /// OAuth client secrets, used to fill client fields missing from the token file
    #[arg(long, global = true, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: DriveCommand,
}

#[derive(Subcommand, Debug)]
pub enum DriveCommand {
    /// List recently modified files and save their metadata
    List {
        /// Number of files to list
        #[arg(long)]
        limit: Option<u32>,

        /// Metadata output file (default: google_drive_activity.json)
        #[arg(long = "out", value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Print the plain-text content of a Google Doc
    Export {
        /// Drive file ID
        file_id: String,

        /// Truncate the text to this many characters
        #[arg(long, value_name = "CHARS")]
        preview: Option<usize>,
    },
    /// List recent files, then preview the first Google Doc among them
    Fetch {
        /// Number of files to list
        #[arg(long)]
        limit: Option<u32>,
    },
}

pub async fn run_drive(args: DriveArgs, config: &ChronicleConfig) -> Result<()> {
    let client = build_client(&args, config);

    match args.command {
        DriveCommand::List { limit, output } => {
            let output = output.unwrap_or_else(|| config.drive.output_file.clone());
            list(&client, limit.unwrap_or(config.drive.page_size), &output).await?;
        }
        DriveCommand::Export { file_id, preview } => {
            export(&client, &file_id, preview).await?;
        }
        DriveCommand::Fetch { limit } => {
            let output = config.drive.output_file.clone();
            let files = list(&client, limit.unwrap_or(config.drive.page_size), &output).await?;
            fetch_first_doc(&client, &files).await?;
        }
    }

    Ok(())
}

fn build_client(args: &DriveArgs, config: &ChronicleConfig) -> DriveClient {
    let credentials: Arc<dyn CredentialProvider> = match StaticToken::from_env() {
        Some(token) => {
            debug!("using access token from environment");
            Arc::new(token)
        }
        None => {
            let token_path = args
                .token
                .clone()
                .unwrap_or_else(|| config.drive.token_file.clone());
            let secrets_path = args
                .credentials
                .clone()
                .unwrap_or_else(|| config.drive.credentials_file.clone());
            Arc::new(AuthorizedUserProvider::new(token_path).with_client_secrets(secrets_path))
        }
    };

    let client = DriveClient::new(credentials);
    match &config.drive.api_base {
        Some(base) => client.with_base_url(base),
        None => client,
    }
}

async fn list(client: &DriveClient, limit: u32, output: &Path) -> Result<Vec<DriveFile>> {
    let files = ui::with_spinner_async(
        "Listing recently modified files",
        "Listed recent files",
        client.list_recent_files(limit),
    )
    .await
    .map_err(report_api_error)
    .context("failed to list Drive files")?;

    if files.is_empty() {
        println!("No files found.");
    } else {
        println!("Recently modified files (metadata will be saved):");
        for file in &files {
            println!("{}", describe(file));
        }
    }

    write_activity(output, &files)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "Successfully fetched and stored activity metadata in '{}'",
        output.display()
    );

    Ok(files)
}

async fn export(client: &DriveClient, file_id: &str, max_chars: Option<usize>) -> Result<()> {
    let text = client
        .export_text(file_id)
        .await
        .map_err(report_api_error)
        .with_context(|| format!("failed to export file {}", file_id))?;

    match text {
        Some(text) => match max_chars {
            Some(max_chars) => println!("{}", preview(&text, max_chars)),
            None => print!("{}", text),
        },
        None => anyhow::bail!("file {} cannot be exported as plain text", file_id),
    }

    Ok(())
}

async fn fetch_first_doc(client: &DriveClient, files: &[DriveFile]) -> Result<()> {
    let Some(doc) = first_google_doc(files) else {
        println!(
            "\nNo Google Docs found in the first {} recently modified files to test content fetching.",
            files.len()
        );
        return Ok(());
    };

    println!(
        "\nAttempting to fetch content for the first Google Doc found: '{}' (ID: {})",
        doc.name, doc.id
    );

    match client.export_text(&doc.id).await.map_err(report_api_error) {
        Ok(Some(content)) if !content.is_empty() => {
            println!("\n--- Content of '{}' ---", doc.name);
            println!("{}", preview(&content, FETCH_PREVIEW_CHARS));
            println!("--- End of content ---");
        }
        Ok(_) => println!("Could not retrieve content for '{}'.", doc.name),
        Err(err) => {
            println!("Could not retrieve content for '{}'.", doc.name);
            debug!("export of {} failed: {}", doc.id, err);
        }
    }

    Ok(())
}

fn describe(file: &DriveFile) -> String {
    format!(
        "- {} (ID: {}, Type: {}, Last Modified: {})",
        file.name,
        file.id,
        file.mime_type,
        file.modified_time.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Log the actionable hint for well-known API statuses.
fn report_api_error(err: DriveError) -> DriveError {
    if let Some(hint) = err.hint() {
        error!("{}", hint);
    }
    err
}
