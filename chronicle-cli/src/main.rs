//! chronicle CLI - personal activity chronicle
//!
//! Gathers a record of recent activity from two sources:
//! - ChatGPT data exports, flattened into one linear transcript per conversation (`parse`)
//! - Google Drive, listing recently modified files and exporting Google Docs as text (`drive`)

use anyhow::Result;
use chronicle_core::config::load_dotenv;
use chronicle_core::ChronicleConfig;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "chronicle",
    author,
    version,
    about = "Flatten ChatGPT exports and fetch recent Google Drive activity",
    long_about = "Turn a ChatGPT data export into linear User/Assistant transcripts, and \
                  collect recently modified Google Drive files with their Google Docs text."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress progress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Flatten a ChatGPT export into linear transcripts
    Parse(commands::parse::ParseArgs),
    /// Recent Google Drive activity (list, export, fetch)
    Drive(commands::drive::DriveArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    ui::init_quiet_mode(cli.quiet);
    load_dotenv();

    let config = ChronicleConfig::load();

    match cli.command {
        Commands::Parse(args) => commands::run_parse(args, &config)?,
        Commands::Drive(args) => commands::run_drive(args, &config).await?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_drive_flags_are_global() {
        let cli = Cli::try_parse_from([
            "chronicle", "drive", "list", "--token", "t.json", "--limit", "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Drive(args) => {
                assert_eq!(args.token.as_deref(), Some(std::path::Path::new("t.json")));
                assert!(matches!(
                    args.command,
                    commands::drive::DriveCommand::List { limit: Some(5), .. }
                ));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
