use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostdns", about = "Configures host DNS for a VPN interface")]
pub struct Args {
    #[arg(long)]
    pub config_path: PathBuf,
    #[arg(long, default_value = "HOSTDNS_")]
    pub env_prefix: String,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Command {
    /// Applies the configured DNS settings until interrupted, then reverts them
    #[default]
    Apply,
    /// Prints the DNS management mode detected on this host
    Detect,
    /// Prints the DNS configuration the OS uses without our settings
    BaseConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["hostdns", "--config-path", "hostdns.toml"]);

        assert_eq!(args.config_path, PathBuf::from("hostdns.toml"));
        assert_eq!(args.env_prefix, "HOSTDNS_");
        assert_eq!(args.command.unwrap_or_default(), Command::Apply);
    }

    #[test]
    fn test_subcommand() {
        let args = Args::parse_from(["hostdns", "--config-path", "a.toml", "base-config"]);
        assert_eq!(args.command, Some(Command::BaseConfig));
    }
}
