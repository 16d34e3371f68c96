use crate::network::NetworkType;
use serde::{Deserialize, Serialize};

/// Chain parameters relevant to transaction construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub network_type: NetworkType,
    /// Outputs below this value are not relayed.
    pub dust_limit: u64,
    /// Fee rate, in satoshis per virtual byte, used when the caller does not provide one.
    pub default_fee_rate: u64,
    /// Largest standard transaction, in virtual bytes.
    pub max_standard_tx_vsize: u64,
}

impl Params {
    pub fn network_type(&self) -> NetworkType {
        self.network_type
    }
}

impl From<NetworkType> for Params {
    fn from(value: NetworkType) -> Self {
        match value {
            NetworkType::Mainnet => MAINNET_PARAMS,
            NetworkType::Testnet => TESTNET_PARAMS,
            NetworkType::Regtest => REGTEST_PARAMS,
        }
    }
}

pub const MAINNET_PARAMS: Params =
    Params { network_type: NetworkType::Mainnet, dust_limit: 330, default_fee_rate: 10, max_standard_tx_vsize: 100_000 };

pub const TESTNET_PARAMS: Params =
    Params { network_type: NetworkType::Testnet, dust_limit: 330, default_fee_rate: 2, max_standard_tx_vsize: 100_000 };

pub const REGTEST_PARAMS: Params =
    Params { network_type: NetworkType::Regtest, dust_limit: 330, default_fee_rate: 1, max_standard_tx_vsize: 100_000 };
