//! Per-network constants.
//!
//! Each supported network has one immutable [`NetworkProfile`] holding the
//! version bytes used by the key and address encodings. Profiles are
//! `'static` and never change after start-up, so they can be shared freely
//! across threads. A [`Network`] tag selects the profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NetworkError;

/// Version bytes and identifiers for one network.
#[derive(Debug, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Tag used in configuration (`"mainnet"` / `"testnet"`).
    pub tag: &'static str,
    /// Base58 version byte for pay-to-pubkey-hash addresses.
    pub pubkey_hash_version: u8,
    /// Base58 version byte for pay-to-script-hash addresses.
    pub script_hash_version: u8,
    /// Version byte prefixed to WIF private keys.
    pub wif_version: u8,
    /// Version prefix of serialized extended private keys.
    pub xprv_version: [u8; 4],
    /// Version prefix of serialized extended public keys.
    pub xpub_version: [u8; 4],
    /// Human-readable part of segwit addresses.
    pub bech32_hrp: &'static str,
    /// BIP-44 coin type registered for this network.
    pub coin_type: u32,
}

pub static MAINNET: NetworkProfile = NetworkProfile {
    tag: "mainnet",
    pubkey_hash_version: 0x00,
    script_hash_version: 0x05,
    wif_version: 0x80,
    xprv_version: [0x04, 0x88, 0xad, 0xe4],
    xpub_version: [0x04, 0x88, 0xb2, 0x1e],
    bech32_hrp: "bc",
    coin_type: 0,
};

pub static TESTNET: NetworkProfile = NetworkProfile {
    tag: "testnet",
    pubkey_hash_version: 0x6f,
    script_hash_version: 0xc4,
    wif_version: 0xef,
    xprv_version: [0x04, 0x35, 0x83, 0x94],
    xpub_version: [0x04, 0x35, 0x87, 0xcf],
    bech32_hrp: "tb",
    coin_type: 1,
};

/// Network selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Parse a configuration tag (`"mainnet"` or `"testnet"`).
    pub fn from_tag(tag: &str) -> Result<Self, NetworkError> {
        match tag {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(NetworkError::UnknownNetwork(tag.to_string())),
        }
    }

    /// The constant table for this network.
    pub fn profile(&self) -> &'static NetworkProfile {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Testnet => &TESTNET,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.profile().tag
    }

    /// Look up the network owning a WIF version byte.
    pub fn from_wif_version(version: u8) -> Option<Self> {
        [Network::Mainnet, Network::Testnet]
            .into_iter()
            .find(|n| n.profile().wif_version == version)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}
