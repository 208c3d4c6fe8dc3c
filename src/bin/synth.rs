use std::path::PathBuf;

use clap::Parser;
use lambda_http::{tracing, Error};
use uppercase_api::{
    config::{StackConfig, DEFAULT_ARTIFACT, DEFAULT_ENTRYPOINT, DEFAULT_RUNTIME},
    descriptor::{self, CallerOverrides, IdentityLookup},
    provision::{apply, DryRunProvisioner},
};

#[derive(Parser)]
#[command(
    name = "synth",
    about = "Emit the resource graph for the uppercase endpoint",
    long_about = "Builds the dependency-ordered resource graph (role, log policy, function,\n\
                  gateway, route, integration, permission, deployment, stage) and prints it\n\
                  as JSON for the provisioning engine."
)]
struct Cli {
    /// Project name, first part of every resource name
    #[arg(long, env = "PROJECT_NAME")]
    project: String,
    /// Stack / environment name, also used as the stage name
    #[arg(long, env = "STACK_NAME")]
    stack: String,
    /// Pre-built function archive
    #[arg(long, env = "FUNCTION_ARTIFACT", default_value = DEFAULT_ARTIFACT)]
    artifact: PathBuf,
    #[arg(long, env = "FUNCTION_RUNTIME", default_value = DEFAULT_RUNTIME)]
    runtime: String,
    #[arg(long, env = "FUNCTION_ENTRYPOINT", default_value = DEFAULT_ENTRYPOINT)]
    entrypoint: String,
    /// Skip the STS lookup for the account id
    #[arg(long, env = "AWS_ACCOUNT_ID")]
    account: Option<String>,
    /// Region for the STS client and the deployed stack
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
    /// Print resolved outputs from a simulated apply instead of the graph
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let cli = Cli::parse();

    let mut config = StackConfig::new(&cli.project, &cli.stack, &cli.artifact)?;
    config.runtime = cli.runtime.clone();
    config.entrypoint = cli.entrypoint.clone();

    let overrides = CallerOverrides {
        account_id: cli.account.clone(),
        region: cli.region.clone(),
    };
    let caller = overrides.resolve().await?;
    let graph = descriptor::build(&config, &caller)?;

    if cli.dry_run {
        let applied = apply(&graph, &DryRunProvisioner::new(caller)).await?;
        println!("{}", serde_json::to_string_pretty(&applied.outputs)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    }

    Ok(())
}
