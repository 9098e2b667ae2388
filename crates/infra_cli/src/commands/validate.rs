//! Validate command - Check the configuration without writing anything.

use anyhow::Result;
use clap::Args;
use tracing::info;

use infra_stacks::{ConfigValidator, InfraError};

use super::ConfigArgs;

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let config = args.config.load()?;
    info!(
        "Validating {} environments",
        config.environments.len()
    );

    let result = ConfigValidator::validate(&config);

    for error in &result.errors {
        println!("error:   {}", error);
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }

    let failed = !result.valid || (args.strict && !result.warnings.is_empty());
    if failed {
        let mut problems = result.errors.clone();
        if args.strict {
            problems.extend(result.warnings.iter().cloned());
        }
        return Err(InfraError::ValidationFailed(problems.join("; ")).into());
    }

    println!("Configuration is valid");
    Ok(())
}
