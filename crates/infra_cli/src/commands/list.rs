//! List command - Show declared stacks in deployment order.

use anyhow::Result;
use clap::Args;

use infra_stacks::{App, Environment};

use super::ConfigArgs;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Only list stacks of this environment (dev, staging, production)
    #[arg(short, long)]
    pub(crate) env: Option<Environment>,
}

pub fn execute(args: ListArgs) -> Result<()> {
    let config = args.config.load()?;
    let app = App::compose(&config)?;

    println!(
        "{:<45} {:<11} {:<9} {:<34} {}",
        "STACK", "ENV", "KIND", "BUCKET", "STATE KEY"
    );

    for stack in app.deployment_order() {
        if args.env.is_some_and(|env| env != stack.environment()) {
            continue;
        }

        println!(
            "{:<45} {:<11} {:<9} {:<34} {}",
            stack.id,
            stack.environment().as_str(),
            stack.kind.as_str(),
            stack.backend.bucket,
            stack.state_key()
        );

        for dependency in app.dependencies(stack) {
            println!("    after {}", dependency);
        }
    }

    Ok(())
}
