use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Configuration for the transaction lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum open proposals a player may have as proposer.
    pub max_pending_per_player: usize,
    /// Proposals older than this many rounds are cancelled by
    /// `expire_stale`. `None` keeps proposals open indefinitely.
    pub pending_ttl_rounds: Option<u32>,
    /// Whether a player may propose a transaction to themselves.
    pub allow_self_trade: bool,
    /// Whether the manager keeps the per-player pending index.
    pub cache_enabled: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_pending_per_player: 16,
            pending_ttl_rounds: None,
            allow_self_trade: false,
            cache_enabled: true,
        }
    }
}

impl LedgerConfig {
    /// Tight limits for tournament play: few open proposals, and every
    /// proposal expires after one round.
    pub fn strict() -> Self {
        Self {
            max_pending_per_player: 4,
            pending_ttl_rounds: Some(1),
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, LedgerError> {
        let config: Self = toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))?;
        if config.max_pending_per_player == 0 {
            return Err(LedgerError::Config(
                "max_pending_per_player must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = LedgerConfig::from_toml_str("pending_ttl_rounds = 2").unwrap();
        assert_eq!(config.pending_ttl_rounds, Some(2));
        assert_eq!(config.max_pending_per_player, 16);
        assert!(config.cache_enabled);
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            LedgerConfig::from_toml_str("max_pending_per_player = 0"),
            Err(LedgerError::Config(_))
        ));
        assert!(LedgerConfig::from_toml_str("allow_self_trade = \"yes\"").is_err());
    }

    #[test]
    fn strict_preset() {
        let config = LedgerConfig::strict();
        assert_eq!(config.pending_ttl_rounds, Some(1));
        assert!(!config.allow_self_trade);
    }
}
