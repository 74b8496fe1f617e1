//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TagResult, ValidationError};

/// Default bound on the length of one mapping chain.
pub const DEFAULT_MAX_MAP_HOPS: usize = 64;

/// Default maximum size of one notification message, header included.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum length of a mapping chain started by one write.
    pub max_map_hops: usize,
    /// Largest notification message the transport accepts.
    pub max_message_size: usize,
    /// Per-module notification stream buffer capacity.
    pub stream_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_map_hops: DEFAULT_MAX_MAP_HOPS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            stream_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> TagResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> TagResult<()> {
        // A notification header alone is 16 bytes.
        if self.max_message_size < 16 {
            return Err(ValidationError::TooBig {
                what: "notification header".to_string(),
                end: 16,
                limit: self.max_message_size,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_map_hops, 64);
        assert_eq!(cfg.max_message_size, 4096);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{ "max_map_hops": 8 }"#).unwrap();
        assert_eq!(cfg.max_map_hops, 8);
        assert_eq!(cfg.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn rejects_tiny_messages_and_bad_json() {
        assert!(EngineConfig::from_json_str(r#"{ "max_message_size": 8 }"#).is_err());
        assert!(EngineConfig::from_json_str("not json").is_err());
    }
}
