//! Pluggable payload compression.
//!
//! The channel treats compression as a strategy chosen at construction time:
//! [`NoCompression`] passes bytes through, [`Lz4Compressor`] uses LZ4 block
//! compression with a 4-byte little-endian size prefix.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Largest decompressed size accepted from a peer (16 MB).
pub const MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// A compression strategy.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Compresses `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Reverses [`Compressor::compress`].
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Short name of the strategy, for logs.
    fn name(&self) -> &'static str;
}

/// Identity strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// LZ4 block compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::compress_prepend_size(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        // Check the declared size before lz4_flex allocates for it
        if data.len() >= 4 {
            let declared = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
            if declared > MAX_DECOMPRESSED_SIZE {
                return Err(ProtocolError::Compression(format!(
                    "decompressed size {} exceeds maximum of {} bytes",
                    declared, MAX_DECOMPRESSED_SIZE
                )));
            }
        }

        Ok(lz4_flex::decompress_size_prepended(data)?)
    }

    fn name(&self) -> &'static str {
        "lz4"
    }
}

/// Selects a compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// No compression.
    #[default]
    None,
    /// LZ4 block compression.
    Lz4,
}

impl CompressionKind {
    /// Builds the strategy.
    pub fn build(self) -> Box<dyn Compressor> {
        match self {
            CompressionKind::None => Box::new(NoCompression),
            CompressionKind::Lz4 => Box::new(Lz4Compressor),
        }
    }
}

impl std::str::FromStr for CompressionKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" | "false" => Ok(CompressionKind::None),
            "lz4" | "on" | "true" => Ok(CompressionKind::Lz4),
            other => Err(ProtocolError::Compression(format!(
                "unknown compression kind: {}",
                other
            ))),
        }
    }
}
