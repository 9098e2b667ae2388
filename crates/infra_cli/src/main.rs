//! core-infra CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 5: IaC error

use std::process::ExitCode;

use clap::Parser;
use infra_stacks::InfraError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const IAC_ERROR: u8 = 5;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "infra=debug"
    } else if cli.quiet {
        "warn"
    } else {
        "infra=info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", default_level)));

    if tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_err()
    {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Synth(args) => commands::synth::execute(args),
        Commands::List(args) => commands::list::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Show(args) => commands::show::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Map an error to its exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<InfraError>() {
        Some(
            InfraError::InvalidRegion(_)
            | InfraError::InvalidEnvironment(_)
            | InfraError::InvalidStackKind(_)
            | InfraError::MissingParameter { .. }
            | InfraError::MissingEnvironment(_)
            | InfraError::StateKeyCollision { .. }
            | InfraError::DuplicateStack(_)
            | InfraError::ValidationFailed(_)
            | InfraError::Yaml(_),
        ) => ExitCodes::VALIDATION_FAILURE,
        Some(InfraError::StackNotFound(_) | InfraError::ConfigRead { .. }) => ExitCodes::INVALID_ARGS,
        Some(InfraError::Io(_) | InfraError::Json(_)) => ExitCodes::IAC_ERROR,
        None => ExitCodes::GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra_stacks::Environment;

    #[test]
    fn test_configuration_errors_are_validation_failures() {
        let err = anyhow::Error::from(InfraError::MissingEnvironment(Environment::Dev))
            .context("Failed to compose");
        assert_eq!(categorize_error(&err), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_unknown_stack_is_invalid_argument() {
        let err = anyhow::Error::from(InfraError::StackNotFound("x".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_unreadable_config_is_invalid_argument() {
        let err = anyhow::Error::from(InfraError::ConfigRead {
            path: "missing.yaml".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
        .context("Failed to load configuration from missing.yaml");
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_write_failure_is_iac_error() {
        let err = anyhow::Error::from(InfraError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )));
        assert_eq!(categorize_error(&err), ExitCodes::IAC_ERROR);
    }

    #[test]
    fn test_foreign_error_is_general() {
        assert_eq!(categorize_error(&anyhow::anyhow!("boom")), ExitCodes::GENERAL_ERROR);
    }
}
