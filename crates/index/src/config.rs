use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::IndexError;

/// Tuning knobs for the lookup engine.
///
/// The defaults reproduce the behavior the fingerprint clients are calibrated
/// against; deployments normally only touch `default_threshold`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LookupConfig {
    /// Head-first entries examined per posting list before giving up on a
    /// candidate frame.
    #[serde(default = "default_entries_per_frame_limit")]
    pub entries_per_frame_limit: usize,
    /// Probe frames a tracked id may go unseen before its window is stale.
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Minimum window length (in probe frames) before a score can be emitted.
    #[serde(default = "default_block")]
    pub block: u32,
    /// Confidence threshold used when a lookup does not pass one explicitly.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    /// Maximum set bits tolerated in a toggle mask; the candidate expansion
    /// is `2^popcount`, so this caps per-frame work.
    #[serde(default = "default_max_toggle_bits")]
    pub max_toggle_bits: u32,
}

fn default_entries_per_frame_limit() -> usize {
    10
}

fn default_steps() -> u32 {
    16
}

fn default_block() -> u32 {
    100
}

fn default_threshold() -> f64 {
    0.30
}

fn default_max_toggle_bits() -> u32 {
    12
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            entries_per_frame_limit: default_entries_per_frame_limit(),
            steps: default_steps(),
            block: default_block(),
            default_threshold: default_threshold(),
            max_toggle_bits: default_max_toggle_bits(),
        }
    }
}

impl LookupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries_per_frame_limit(mut self, limit: usize) -> Self {
        self.entries_per_frame_limit = limit;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_block(mut self, block: u32) -> Self {
        self.block = block;
        self
    }

    pub fn with_default_threshold(mut self, threshold: f64) -> Self {
        self.default_threshold = threshold;
        self
    }

    pub fn with_max_toggle_bits(mut self, bits: u32) -> Self {
        self.max_toggle_bits = bits;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.entries_per_frame_limit == 0 {
            return Err(IndexError::InvalidConfig(
                "entries_per_frame_limit must be greater than zero".into(),
            ));
        }
        if self.block == 0 {
            return Err(IndexError::InvalidConfig(
                "block must be greater than zero".into(),
            ));
        }
        if !(self.default_threshold > 0.0 && self.default_threshold <= 1.0) {
            return Err(IndexError::InvalidConfig(
                "default_threshold must be in (0.0, 1.0]".into(),
            ));
        }
        if self.max_toggle_bits > 32 {
            return Err(IndexError::InvalidConfig(
                "max_toggle_bits must be at most 32".into(),
            ));
        }
        Ok(())
    }
}

/// Compression codec options for snapshot bodies.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotCompression {
    /// No compression (useful for debugging).
    None,
    /// Zstd compression (default).
    #[default]
    Zstd,
}

/// Snapshot encoding behavior. Save and load must agree on it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub codec: SnapshotCompression,
    /// Compression level (1-22 for Zstd).
    #[serde(default = "default_level")]
    pub level: i32,
}

fn default_level() -> i32 {
    3
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            codec: SnapshotCompression::default(),
            level: default_level(),
        }
    }
}

impl SnapshotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(mut self, codec: SnapshotCompression) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            SnapshotCompression::None => Ok(data.to_vec()),
            SnapshotCompression::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    pub(crate) fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            SnapshotCompression::None => Ok(data.to_vec()),
            SnapshotCompression::Zstd => Ok(decode_all(data)?),
        }
    }
}
