//! Configuration types for document chunking.

use serde::{Deserialize, Serialize};

/// Configuration for document chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    /// Overlap between adjacent chunks in characters. Must be less than `chunk_chars`.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

fn default_chunk_chars() -> usize {
    1000
}

fn default_overlap_chars() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

impl ChunkingConfig {
    /// Create a config, checking the overlap invariant.
    pub fn new(chunk_chars: usize, overlap_chars: usize) -> Result<Self, String> {
        let config = Self {
            chunk_chars,
            overlap_chars,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_chars == 0 {
            return Err("chunk_chars must be greater than zero".to_string());
        }

        if self.overlap_chars >= self.chunk_chars {
            return Err(format!(
                "overlap_chars ({}) must be less than chunk_chars ({})",
                self.overlap_chars, self.chunk_chars
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_config_defaults() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_chars, 1000);
        assert_eq!(config.overlap_chars, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunking_config_validation() {
        assert!(ChunkingConfig::new(100, 99).is_ok());
        assert!(ChunkingConfig::new(100, 0).is_ok());

        // Invalid: overlap >= chunk
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(100, 300).is_err());

        // Invalid: zero-sized chunks
        assert!(ChunkingConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ChunkingConfig = toml::from_str("chunk_chars = 500").unwrap();
        assert_eq!(config.chunk_chars, 500);
        assert_eq!(config.overlap_chars, 200);
    }
}
