//! CLI command definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use infra_stacks::InfraConfig;

pub mod list;
pub mod show;
pub mod synth;
pub mod validate;

/// core-infra - Terraform stacks for the core-infra AWS accounts
#[derive(Parser)]
#[command(name = "core-infra")]
#[command(version, about = "Synthesize core-infra Terraform stacks")]
#[command(long_about = r#"
Composes per-environment parameters into Terraform JSON stacks.

STACKS:
  registry  → ECR repository (dev)
  ci-role   → GitHub Actions role reading the registry state (all environments)

Run `terraform init && terraform apply` inside each synthesized stack folder,
registry stacks first.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  5 - IaC error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose all stacks and write their Terraform JSON
    Synth(synth::SynthArgs),

    /// List declared stacks in deployment order
    List(list::ListArgs),

    /// Validate the configuration
    Validate(validate::ValidateArgs),

    /// Print one stack's Terraform JSON
    Show(show::ShowArgs),
}

/// Configuration source shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// YAML configuration file (built-in environments when omitted)
    #[arg(short, long, env = "CORE_INFRA_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<InfraConfig> {
        InfraConfig::load(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load built-in configuration".to_string(),
        })
    }
}
