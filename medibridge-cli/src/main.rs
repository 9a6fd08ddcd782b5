//! MediBridge CLI - Command-line interface
//!
//! Provides command-line access to drug lookup, catalogue import and
//! prescription submission.

mod commands;

use clap::Parser;
use medibridge_core::MedibridgeError;
use medibridge_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "medibridge")]
#[command(about = "Clinic client for the MediBridge prescription service")]
#[command(version)]
struct Cli {
    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Use the built-in development formulary instead of the API for drug lookups
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_tracing_level(), None) {
        eprintln!("Warning: could not set up log file: {e}");
    }

    match commands::handle_command(cli.command, cli.demo).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {e:?}");
            match e.downcast_ref::<MedibridgeError>() {
                Some(error) => eprintln!("Error: {}", error.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "medibridge",
            "drugs",
            "search",
            "para",
            "--local",
            "--demo",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert!(cli.demo);
        assert_eq!(cli.log_level, CliLogLevel::Debug);
        assert!(matches!(
            cli.command,
            commands::Commands::Drugs {
                command: commands::DrugCommands::Search { local: true, .. }
            }
        ));
    }
}
