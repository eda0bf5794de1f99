//! Voltage
//!
//! Command-line tool for Voltage secure channels.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use voltage_cli::config::{default_config_path, Config};
use voltage_cli::{demo, inspect, keygen, Identity};

/// Voltage - secure point-to-point channels.
#[derive(Parser, Debug)]
#[command(name = "voltage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate an identity key pair
    Keygen {
        /// Store the private key in this config file instead of printing it
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run a handshake and message exchange between two in-memory channels
    Demo {
        /// Number of data messages to exchange
        #[arg(long, short, default_value = "10")]
        messages: usize,

        /// Compress payloads (overrides the config file)
        #[arg(long)]
        compress: bool,

        /// Output the summary in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Decode a base64-encoded wire message and print its fields
    Inspect {
        /// The encoded message
        message: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();
    config.validate()?;

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.log_level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Using config file: {:?}", config_path);

    match cli.command {
        Commands::Keygen { output, json } => {
            let keys = keygen::generate()?;
            let identity = Identity::from_keys(&keys);

            if let Some(path) = output {
                keygen::store(&path, &keys)?;
                println!("Stored private key in {}", path.display());
                println!("Fingerprint: {}", identity.fingerprint);
            } else if json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!("Private key: {}", identity.private_key);
                println!("Public key:  {}", identity.public_key);
                println!("Fingerprint: {}", identity.fingerprint);
            }
        }
        Commands::Demo {
            messages,
            compress,
            json,
        } => {
            let mut channel_config = config.channel_config()?;
            if compress {
                channel_config.enable_compression = true;
            }

            let report = demo::run(&channel_config, messages).context("Demo failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Handshake complete");
                println!("  Initiator:   {}", report.initiator);
                println!("  Responder:   {}", report.responder);
                println!("  Compression: {}", report.compression);
                println!(
                    "Exchanged {} messages ({} plaintext bytes, {} bytes on the wire)",
                    report.messages, report.plaintext_bytes, report.wire_bytes
                );
                println!("All messages verified, {} unique nonces", report.unique_nonces);
            }
        }
        Commands::Inspect { message, json } => {
            let inspection = inspect::inspect(&message)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&inspection)?);
            } else {
                println!("{}", inspection);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_demo_defaults() {
        let cli = Cli::try_parse_from(["voltage", "demo"]).unwrap();
        match cli.command {
            Commands::Demo {
                messages,
                compress,
                json,
            } => {
                assert_eq!(messages, 10);
                assert!(!compress);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "voltage",
            "keygen",
            "--config",
            "/tmp/voltage.toml",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/voltage.toml")));
    }

    #[test]
    fn test_inspect_requires_message() {
        assert!(Cli::try_parse_from(["voltage", "inspect"]).is_err());
    }
}
