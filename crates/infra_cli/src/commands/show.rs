//! Show command - Print one stack's Terraform JSON.

use anyhow::Result;
use clap::Args;

use infra_stacks::App;

use super::ConfigArgs;

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Stack id, e.g. core-infra-dev-ecr-stack
    #[arg(short, long)]
    stack: String,
}

pub fn execute(args: ShowArgs) -> Result<()> {
    let config = args.config.load()?;
    let app = App::compose(&config)?;

    print!("{}", app.stack(&args.stack)?.to_json()?);
    Ok(())
}
