//! BIP-39 mnemonic backup: 24-word phrases and phrase → seed.

use bip39::{Language, Mnemonic};
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::keys::Seed;

/// Entropy size for a 24-word phrase.
const ENTROPY_LEN: usize = 32;

/// Generate a fresh 24-word English mnemonic from OS randomness.
pub fn generate_mnemonic() -> String {
    use rand::RngCore;
    let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
    rand::rngs::OsRng.fill_bytes(entropy.as_mut_slice());
    entropy_to_mnemonic(&entropy)
}

/// Encode 32 bytes of entropy as a 24-word English mnemonic.
pub fn entropy_to_mnemonic(entropy: &[u8; ENTROPY_LEN]) -> String {
    Mnemonic::from_entropy_in(Language::English, entropy)
        .expect("32 bytes always produces valid mnemonic")
        .to_string()
}

/// Parse a BIP-39 phrase and stretch it with `passphrase` into a 64-byte seed.
///
/// Normalizes whitespace and converts to lowercase before parsing. The
/// passphrase is the optional BIP-39 "25th word", not the key encryption
/// passphrase.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    let m = parse(phrase)?;
    let seed = Zeroizing::new(m.to_seed(passphrase));
    Seed::from_bytes(seed.as_slice())
}

/// Check that a phrase is a valid English BIP-39 mnemonic.
pub fn validate_mnemonic(phrase: &str) -> Result<(), WalletError> {
    parse(phrase).map(|_| ())
}

fn parse(phrase: &str) -> Result<Mnemonic, WalletError> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    );
    Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}
