use ap_config::ExplorerConfig;
use ap_types::AccountAddress;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// Aggregate the on-chain state of every deployed instance of a contract
/// type, or inspect a single instance.
#[derive(Debug, Parser)]
#[command(name = "argus", version)]
pub struct RunCmd {
    /// Contract type to aggregate, as named in the metadata registry.
    pub contract_name: String,

    /// YAML configuration file; defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Ledger API base url, overriding the config file.
    #[arg(long, env = "ARGUS_API_URL", value_name = "URL")]
    pub api_url: Option<Url>,

    /// Metadata directory, overriding the config file.
    #[arg(long, env = "ARGUS_META_DIR", value_name = "DIR")]
    pub meta_dir: Option<PathBuf>,

    /// Fetch only these state variables.
    #[arg(long, value_delimiter = ',', value_name = "NAME,...")]
    pub properties: Option<Vec<String>>,

    /// Inspect one deployed instance instead of the whole type.
    #[arg(long, value_name = "ADDRESS")]
    pub address: Option<AccountAddress>,

    /// With --address: print the fused detail document instead of state.
    #[arg(long, requires = "address")]
    pub detail: bool,

    /// With --address: look up one mapping entry, written as <name>/<key>.
    #[arg(long, requires = "address", value_name = "NAME/KEY")]
    pub mapping: Option<String>,

    /// Print every task outcome, exhausted fetches included.
    #[arg(long)]
    pub outcomes: bool,
}

impl RunCmd {
    pub fn apply_overrides(&self, config: &mut ExplorerConfig) {
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(meta_dir) = &self.meta_dir {
            config.meta_dir = meta_dir.clone();
        }
    }
}
