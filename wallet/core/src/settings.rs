//!
//! Wallet settings: network, fee policy, covenant output values and
//! provider timeouts. Settings are read from TOML; every field is optional
//! and falls back to its default.
//!

use crate::imports::*;
use cat_consensus_core::{config::params::Params, network::NetworkType};
use std::path::Path;

/// Value of a minter output.
pub const MINTER_POSTAGE: u64 = 331;
/// Value of a token or NFT output.
pub const TOKEN_POSTAGE: u64 = 330;
/// Value of a guard output.
pub const GUARD_POSTAGE: u64 = 332;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct WalletSettings {
    pub network: NetworkType,
    /// Satoshis per virtual byte. Falls back to the network default.
    pub fee_rate: Option<u64>,
    pub minter_satoshis: u64,
    pub token_satoshis: u64,
    pub guard_satoshis: u64,
    /// Per fetch of a raw transaction or UTXO set.
    pub fetch_timeout_millis: u64,
    pub broadcast_retry_attempts: u32,
    pub broadcast_retry_delay_millis: u64,
    /// Run the verification engine over every transaction before it is broadcast.
    pub verify_transactions: bool,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            network: NetworkType::default(),
            fee_rate: None,
            minter_satoshis: MINTER_POSTAGE,
            token_satoshis: TOKEN_POSTAGE,
            guard_satoshis: GUARD_POSTAGE,
            fetch_timeout_millis: 30_000,
            broadcast_retry_attempts: 3,
            broadcast_retry_delay_millis: 1_000,
            verify_transactions: true,
        }
    }
}

impl WalletSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn params(&self) -> Params {
        Params::from(self.network)
    }

    pub fn fee_rate(&self) -> u64 {
        self.fee_rate.unwrap_or_else(|| self.params().default_fee_rate)
    }

    pub fn dust_limit(&self) -> u64 {
        self.params().dust_limit
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_millis)
    }

    pub fn broadcast_retry_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_retry_delay_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_and_overrides() {
        let settings = WalletSettings::from_toml_str("").unwrap();
        assert_eq!(settings, WalletSettings::default());
        assert_eq!(settings.fee_rate(), settings.params().default_fee_rate);

        let settings = WalletSettings::from_toml_str(
            r#"
            network = "regtest"
            fee-rate = 7
            guard-satoshis = 1000
            verify-transactions = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.network, NetworkType::Regtest);
        assert_eq!(settings.fee_rate(), 7);
        assert_eq!(settings.guard_satoshis, 1000);
        assert_eq!(settings.token_satoshis, TOKEN_POSTAGE);
        assert!(!settings.verify_transactions);

        let text = settings.to_toml_string().unwrap();
        assert_eq!(WalletSettings::from_toml_str(&text).unwrap(), settings);

        assert!(WalletSettings::from_toml_str("network = \"devnet\"").is_err());
    }
}
