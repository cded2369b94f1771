//! Wallet configuration.

use serde::{Deserialize, Serialize};

use cairn_core::network::Network;

use crate::encryption::KdfParams;

/// Configuration for a wallet instance.
///
/// Constructed by the caller and passed in; nothing in the wallet reads
/// global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Network whose version bytes are used for keys.
    pub network: Network,
    /// BIP-44 coin type (second path level).
    pub coin_type: u32,
    /// BIP-44 account index (third path level).
    pub account: u32,
    /// scrypt hardness for encrypted keys. Must match between encrypt and decrypt.
    pub kdf: KdfParams,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl WalletConfig {
    /// Mainnet, coin type 0, account 0, default scrypt parameters.
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            coin_type: Network::Mainnet.profile().coin_type,
            account: 0,
            kdf: KdfParams::default(),
        }
    }

    /// Testnet, coin type 1, account 0, default scrypt parameters.
    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            coin_type: Network::Testnet.profile().coin_type,
            ..Self::mainnet()
        }
    }

    /// Same configuration with a different account index.
    pub fn with_account(self, account: u32) -> Self {
        Self { account, ..self }
    }

    /// Same configuration with different scrypt parameters.
    pub fn with_kdf(self, kdf: KdfParams) -> Self {
        Self { kdf, ..self }
    }
}
