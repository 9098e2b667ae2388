//! Synth command - Write every stack's Terraform JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use infra_stacks::App;

use super::ConfigArgs;

#[derive(Args)]
pub struct SynthArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output directory (defaults to the configured output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn execute(args: SynthArgs) -> Result<()> {
    let config = args.config.load()?;
    let app = App::compose(&config)?;

    let out_dir = args.output.unwrap_or_else(|| app.output_dir().to_path_buf());
    info!("Synthesizing into {}", out_dir.display());

    let manifest = app.synth(&out_dir)?;

    println!("Synthesized {} stacks into {}", manifest.stacks.len(), out_dir.display());
    for stack in app.deployment_order() {
        if let Some(entry) = manifest.stacks.get(&stack.id) {
            println!("  {:<45} {}", entry.name, entry.synthesized_stack_path);
        }
    }

    Ok(())
}
