// CLI for provisioning a DEX test environment
//
// Each subcommand runs one provisioning stage against the configured
// network; `all` runs them in order. Outputs are recorded per network so
// interrupted runs can be resumed.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use dex_testbed_sdk::Stage;

#[derive(Parser, Debug)]
#[command(name = "dex-testbed")]
#[command(about = "Concentrated-liquidity DEX test environment provisioner", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to provisioning configuration file
    #[arg(short, long, default_value = "provision.toml", global = true)]
    config: PathBuf,

    /// Network name; selects the deployment record
    #[arg(short, long, env = "NETWORK", global = true)]
    network: Option<String>,

    /// JSON-RPC endpoint of the network
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Hex private key of the signing account
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    /// Directory holding the deployment records
    #[arg(long, global = true)]
    deployments_dir: Option<PathBuf>,

    /// Log level; RUST_LOG takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy wrapped native, factory, position manager and router
    Infra,

    /// Deploy the configured test tokens
    Tokens,

    /// Create, initialize and seed the configured pools
    Pools(commands::stage::PoolsCmd),

    /// Swap through the seeded pools in both directions
    Swaps,

    /// Deploy the lending pool mock
    LendingDeploy,

    /// Permit and supply into the lending pool mock
    LendingDemo,

    /// Send every recorded token to a recipient
    Fund(commands::stage::FundCmd),

    /// Run every stage in order
    All(commands::stage::AllCmd),

    /// Print the deployment record
    Status,

    /// Write an example configuration file
    InitConfig(commands::init_config::InitConfigCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let overrides = commands::Overrides {
        network: cli.network,
        rpc_url: cli.rpc_url,
        private_key: cli.private_key,
        deployments_dir: cli.deployments_dir,
    };

    match cli.command {
        Commands::Infra => commands::stage::execute(Stage::Infra, &cli.config, &overrides).await,
        Commands::Tokens => commands::stage::execute(Stage::Tokens, &cli.config, &overrides).await,
        Commands::Pools(cmd) => commands::stage::execute_pools(cmd, &cli.config, &overrides).await,
        Commands::Swaps => commands::stage::execute(Stage::Swaps, &cli.config, &overrides).await,
        Commands::LendingDeploy => commands::stage::execute(Stage::LendingDeploy, &cli.config, &overrides).await,
        Commands::LendingDemo => commands::stage::execute(Stage::LendingDemo, &cli.config, &overrides).await,
        Commands::Fund(cmd) => commands::stage::execute_fund(cmd, &cli.config, &overrides).await,
        Commands::All(cmd) => commands::stage::execute_all(cmd, &cli.config, &overrides).await,
        Commands::Status => commands::status::execute(&cli.config, &overrides),
        Commands::InitConfig(cmd) => commands::init_config::execute(cmd, &cli.config),
    }
}

fn init_logging(level: &str) {
    let log_level = level.parse().unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dex_testbed={},dex_testbed_sdk={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
