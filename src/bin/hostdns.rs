use anyhow::{Context, Result};
use clap::Parser;
use hostdns::config::{FromPath, HostDnsConfig};
use hostdns::health::Health;
use hostdns::network::dns::{detect_dns_mode, new_os_configurator, Manager};
use hostdns::utils::cli::{Args, Command};
use hostdns::utils::signal_handler::handle_ctrl_c;
use hostdns::utils::tracing::enable_tracing;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args: Args = Args::parse();

    if let Err(e) = run(args).await {
        error!("A critical error occurred: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = HostDnsConfig::from_path(&args.config_path, &args.env_prefix)?;
    enable_tracing(&config.log.level)?;

    match args.command.unwrap_or_default() {
        Command::Detect => detect(&config),
        Command::BaseConfig => base_config(&config),
        Command::Apply => apply(&config).await,
    }
}

fn detect(config: &HostDnsConfig) -> Result<()> {
    match detect_dns_mode(&config.network_manager.unsafe_versions)? {
        Some(mode) => println!("{mode}"),
        None => println!("unsupported"),
    }

    Ok(())
}

fn base_config(config: &HostDnsConfig) -> Result<()> {
    let health = Health::new();
    let os = new_os_configurator(
        &health,
        &config.interface_name,
        &config.network_manager.unsafe_versions,
    )?;

    let base = os.get_base_config().context("reading OS base config")?;
    println!("{}", serde_json::to_string_pretty(&base)?);

    Ok(())
}

async fn apply(config: &HostDnsConfig) -> Result<()> {
    let health = Arc::new(Health::new());
    let os = new_os_configurator(
        &health,
        &config.interface_name,
        &config.network_manager.unsafe_versions,
    )
    .context("creating OS DNS configurator")?;

    let mut manager = Manager::new(os, health.clone(), config.service_ip);

    let compiled = match manager.set(&config.dns) {
        Ok(compiled) => compiled,
        Err(e) => {
            if let Err(close_err) = manager.down() {
                error!("failed to revert DNS configuration: {close_err}");
            }
            return Err(e).context("applying DNS configuration");
        }
    };

    info!(
        "DNS configured on {}: nameservers {:?}, {} stub routes, {} local domains",
        config.interface_name,
        compiled.os.nameservers,
        compiled.stub_routes.len(),
        compiled.local_domains.len()
    );

    handle_ctrl_c().await?;

    manager.down().context("reverting DNS configuration")?;
    if let Some(e) = health.overall_error() {
        error!("unhealthy on exit: {e}");
    }

    Ok(())
}
