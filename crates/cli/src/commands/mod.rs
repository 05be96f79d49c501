// Command modules for the dex-testbed CLI

pub mod init_config;
pub mod stage;
pub mod status;
pub mod utils;

use std::path::PathBuf;

/// Settings given on the command line or in the environment; they win
/// over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
    pub deployments_dir: Option<PathBuf>,
}
