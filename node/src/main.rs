//! Argus command line: aggregate the live state of every deployed instance
//! of a contract type and print the result as JSON.

mod cli;

use anyhow::Context;
use ac_state::StateAggregator;
use ap_config::ExplorerConfig;
use clap::Parser;
use cli::RunCmd;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cmd = RunCmd::parse();

    let mut config = match &cmd.config_file {
        Some(path) => ExplorerConfig::from_yaml_file(path)?,
        None => ExplorerConfig::default(),
    };
    cmd.apply_overrides(&mut config);

    let aggregator = StateAggregator::from_config(&config).context("building the aggregation pipeline")?;

    let document = match (&cmd.address, &cmd.mapping) {
        (Some(address), Some(lookup)) => {
            let (mapping, key) = lookup
                .split_once('/')
                .context("mapping lookups are written as --mapping <name>/<key>")?;
            serde_json::to_value(
                aggregator
                    .mapping_value(&cmd.contract_name, *address, mapping, key)
                    .await?
                    .context("contract not found")?,
            )?
        }
        (Some(address), None) if cmd.detail => serde_json::to_value(
            aggregator.instance_detail(&cmd.contract_name, *address).await?.context("contract not found")?,
        )?,
        (Some(address), None) => serde_json::to_value(
            aggregator
                .state_of(&cmd.contract_name, *address, cmd.properties.as_deref())
                .await?
                .context("contract not found")?,
        )?,
        (None, _) if cmd.outcomes => {
            serde_json::to_value(aggregator.fetch_states_for(&cmd.contract_name, cmd.properties.as_deref()).await?)?
        }
        (None, _) => {
            serde_json::to_value(aggregator.get_states_for(&cmd.contract_name, cmd.properties.as_deref()).await?)?
        }
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&document)?);
    }
    Ok(())
}
