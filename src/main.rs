use color_eyre::eyre::{
    Result,
    eyre,
};
use minter_console::{
    client,
    config,
    wallets,
};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    OnceLock::new();

/// Logs go to a rolling file; stdout belongs to the terminal UI.
fn init_tracing() {
    let file_appender = rolling::daily("logs", "minter-console.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    let _ = LOG_GUARD.set(guard);
}

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: minter-console [--devnet | --testnet | --local] [--rpc-url <url>]\n\
         [--wallet <name>] [--wallet-dir <path>]\n\
         [--config <path>]\n\
         \n\
         Flags:\n\
           --devnet            Connect to Fuel devnet (default RPC {})\n\
           --testnet           Connect to Fuel testnet (default RPC {})\n\
           --local             Connect to a local Fuel node (default RPC {})\n\
           --rpc-url <url>     Override the RPC URL for the selected network\n\
           --wallet <name>     forc-wallet profile holding the contract owner key\n\
           --wallet-dir <path> Override forc-wallet directory (defaults to ~/.fuel/wallets)\n\
           --config <path>     Collection config file (defaults to {})",
        client::DEFAULT_DEVNET_RPC_URL,
        client::DEFAULT_TESTNET_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
        config::DEFAULT_COLLECTION_PATH,
    );
    std::process::exit(0);
}

#[derive(Clone, Copy)]
enum NetworkFlag {
    Devnet,
    Testnet,
    Local,
}

#[derive(Debug)]
struct CliArgs {
    network: client::NetworkTarget,
    wallet: String,
    wallet_dir: Option<String>,
    config_path: Option<String>,
}

fn select_network(slot: &mut Option<NetworkFlag>, flag: NetworkFlag) -> Result<()> {
    if slot.replace(flag).is_some() {
        return Err(eyre!(
            "Multiple network flags provided; choose one of --devnet/--testnet/--local"
        ));
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut config_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--devnet" => select_network(&mut network_flag, NetworkFlag::Devnet)?,
            "--testnet" => select_network(&mut network_flag, NetworkFlag::Testnet)?,
            "--local" => select_network(&mut network_flag, NetworkFlag::Local)?,
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--devnet/--testnet/--local)"
                    ));
                }
                custom_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--config requires a path argument"))?;
                if config_path.is_some() {
                    return Err(eyre!("--config may only be specified once"));
                }
                config_path = Some(path);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = match network_flag {
        None => {
            return Err(eyre!(
                "Select a network with --devnet, --testnet, or --local"
            ));
        }
        Some(NetworkFlag::Devnet) => client::NetworkTarget::Devnet {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_DEVNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Testnet) => client::NetworkTarget::Testnet {
            url: custom_url
                .unwrap_or_else(|| client::DEFAULT_TESTNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Local) => client::NetworkTarget::LocalNode {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_LOCAL_RPC_URL.to_string()),
        },
    };

    let wallet = wallet_name.ok_or_else(|| {
        eyre!("Specify --wallet <name> to select a forc-wallet profile")
    })?;

    Ok(CliArgs {
        network,
        wallet,
        wallet_dir,
        config_path,
    })
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let cli = parse_args(std::env::args().skip(1))?;
    let dir = wallets::resolve_wallet_dir(cli.wallet_dir.as_deref())?;
    let wallets = client::WalletConfig::ForcKeystore {
        owner: cli.wallet,
        dir,
    };
    let collection = config::CollectionConfig::load(
        cli.config_path
            .as_deref()
            .unwrap_or(config::DEFAULT_COLLECTION_PATH),
    )?;

    Ok(client::AppConfig {
        network: cli.network,
        wallets,
        collection,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    color_eyre::install()?;
    tracing::info!("starting minter console");
    let app_config = parse_cli_args()?;
    client::run_app(app_config).await
}
