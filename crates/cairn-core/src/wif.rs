//! Wallet Import Format for private keys.
//!
//! `base58check(version || secret[32] || 0x01)`. The trailing `0x01` marks
//! the key as used with its compressed public key; all keys this wallet
//! produces are compressed.

use zeroize::Zeroizing;

use crate::crypto::KeyPair;
use crate::error::EncodingError;
use crate::network::Network;

const COMPRESSED_FLAG: u8 = 0x01;
const COMPRESSED_PAYLOAD_LEN: usize = 34;
const UNCOMPRESSED_PAYLOAD_LEN: usize = 33;

/// A decoded WIF string.
pub struct DecodedWif {
    pub secret: Zeroizing<[u8; 32]>,
    pub network: Network,
    pub compressed: bool,
}

impl std::fmt::Debug for DecodedWif {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedWif")
            .field("network", &self.network)
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

/// Encode a 32-byte secret as compressed WIF for `network`.
pub fn encode(secret: &[u8; 32], network: Network) -> String {
    let mut payload = Zeroizing::new(Vec::with_capacity(COMPRESSED_PAYLOAD_LEN));
    payload.push(network.profile().wif_version);
    payload.extend_from_slice(secret);
    payload.push(COMPRESSED_FLAG);
    bs58::encode(payload.as_slice()).with_check().into_string()
}

/// Decode a WIF string, identifying its network from the version byte.
pub fn decode(s: &str) -> Result<DecodedWif, EncodingError> {
    let payload = Zeroizing::new(
        bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| EncodingError::Base58(e.to_string()))?,
    );

    let compressed = match payload.len() {
        COMPRESSED_PAYLOAD_LEN => {
            let flag = payload[COMPRESSED_PAYLOAD_LEN - 1];
            if flag != COMPRESSED_FLAG {
                return Err(EncodingError::InvalidCompressionFlag(flag));
            }
            true
        }
        UNCOMPRESSED_PAYLOAD_LEN => false,
        got => {
            return Err(EncodingError::InvalidLength {
                expected: COMPRESSED_PAYLOAD_LEN,
                got,
            });
        }
    };

    let network =
        Network::from_wif_version(payload[0]).ok_or(EncodingError::UnknownVersion(payload[0]))?;

    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&payload[1..33]);
    Ok(DecodedWif {
        secret,
        network,
        compressed,
    })
}

impl KeyPair {
    /// Compressed WIF for this key on `network`.
    pub fn to_wif(&self, network: Network) -> String {
        encode(&self.secret_bytes(), network)
    }
}
