//! # Voltage CLI Library
//!
//! Support code for the `voltage` command-line tool.
//!
//! ## Overview
//!
//! The tool never opens a socket. It provides:
//!
//! - **Configuration**: TOML config file with environment overrides
//! - **Key Generation**: Stable P-256 identities for the `[channel]` section
//! - **Demo**: Two in-memory channels running a handshake and an exchange
//! - **Inspection**: Decoding of base64-encoded wire messages
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading, validation and saving
//! - [`keygen`]: Identity generation and storage
//! - [`demo`]: In-memory channel demonstration
//! - [`inspect`]: Wire message inspection

pub mod config;
pub mod demo;
pub mod inspect;
pub mod keygen;

pub use config::{default_config_path, Config, ConfigError};
pub use demo::DemoReport;
pub use inspect::Inspection;
pub use keygen::Identity;
