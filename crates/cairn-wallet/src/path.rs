//! BIP-32 derivation paths and the BIP-44 account layout.
//!
//! Paths render as `m/44'/0'/0'/0/5`. When parsing, `'`, `h` and `H` all mark
//! a hardened step.

use std::fmt;
use std::str::FromStr;

use cairn_core::constants::{BIP44_PURPOSE, EXTERNAL_CHAIN, HARDENED_OFFSET, INTERNAL_CHAIN};

use crate::error::WalletError;

/// One step of a derivation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildNumber {
    index: u32,
    hardened: bool,
}

impl ChildNumber {
    /// A normal step. An index with the top bit set is treated as hardened.
    pub fn normal(index: u32) -> Self {
        Self::from_raw(index)
    }

    pub fn hardened(index: u32) -> Self {
        Self {
            index: index & !HARDENED_OFFSET,
            hardened: true,
        }
    }

    /// Decode the 32-bit wire form, where the top bit marks hardened.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            index: raw & !HARDENED_OFFSET,
            hardened: raw & HARDENED_OFFSET != 0,
        }
    }

    /// Index without the hardened bit.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// The 32-bit wire form (`index | 0x8000_0000` when hardened).
    pub fn to_raw(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl FromStr for ChildNumber {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix(['\'', 'h', 'H']) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let index: u32 = digits
            .parse()
            .map_err(|_| WalletError::InvalidPath(format!("bad step {s:?}")))?;
        if index >= HARDENED_OFFSET {
            return Err(WalletError::InvalidPath(format!(
                "step {s:?} out of range"
            )));
        }
        Ok(Self { index, hardened })
    }
}

/// An ordered list of derivation steps from the master key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// The empty path (`m`).
    pub fn master() -> Self {
        Self(Vec::new())
    }

    pub fn steps(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new path extended by one step.
    pub fn child(&self, step: ChildNumber) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    /// A new path extended by all of `steps`.
    pub fn extend<I: IntoIterator<Item = ChildNumber>>(&self, steps: I) -> Self {
        let mut out = self.0.clone();
        out.extend(steps);
        Self(out)
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(steps: Vec<ChildNumber>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(WalletError::InvalidPath(format!(
                "{s:?} must start with \"m\""
            )));
        }
        parts
            .map(ChildNumber::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// The five-level `m/44'/coin'/account'/change/index` wallet path.
///
/// Every level is below `2^31` and `change` is 0 or 1, so the first three
/// steps are always hardened and the last two always normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bip44Path {
    coin_type: u32,
    account: u32,
    change: u32,
    index: u32,
}

impl Bip44Path {
    pub fn new(coin_type: u32, account: u32, change: u32, index: u32) -> Result<Self, WalletError> {
        for (level, value) in [("coin_type", coin_type), ("account", account), ("index", index)] {
            if value >= HARDENED_OFFSET {
                return Err(WalletError::InvalidPath(format!(
                    "{level} {value} out of range"
                )));
            }
        }
        if change != EXTERNAL_CHAIN && change != INTERNAL_CHAIN {
            return Err(WalletError::InvalidPath(format!("change {change} is not 0 or 1")));
        }
        Ok(Self {
            coin_type,
            account,
            change,
            index,
        })
    }

    /// Receiving address path (change level 0).
    pub fn receive(coin_type: u32, account: u32, index: u32) -> Result<Self, WalletError> {
        Self::new(coin_type, account, EXTERNAL_CHAIN, index)
    }

    /// Change address path (change level 1).
    pub fn change(coin_type: u32, account: u32, index: u32) -> Result<Self, WalletError> {
        Self::new(coin_type, account, INTERNAL_CHAIN, index)
    }

    pub fn coin_type(&self) -> u32 {
        self.coin_type
    }

    pub fn account(&self) -> u32 {
        self.account
    }

    /// Change level: 0 for receiving, 1 for change.
    pub fn change_level(&self) -> u32 {
        self.change
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// The hardened account prefix `m/44'/coin'/account'`.
    pub fn account_path(&self) -> DerivationPath {
        DerivationPath(vec![
            ChildNumber::hardened(BIP44_PURPOSE),
            ChildNumber::hardened(self.coin_type),
            ChildNumber::hardened(self.account),
        ])
    }

    /// The two normal steps below the account node.
    pub fn relative_steps(&self) -> [ChildNumber; 2] {
        [
            ChildNumber::normal(self.change),
            ChildNumber::normal(self.index),
        ]
    }

    pub fn to_derivation_path(&self) -> DerivationPath {
        self.account_path().extend(self.relative_steps())
    }
}

impl From<Bip44Path> for DerivationPath {
    fn from(path: Bip44Path) -> Self {
        path.to_derivation_path()
    }
}

impl fmt::Display for Bip44Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_derivation_path().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bip44_layout() {
        let path = Bip44Path::new(1, 2, 0, 7).unwrap().to_derivation_path();
        let steps = path.steps();
        assert_eq!(steps.len(), 5);
        assert!(steps[..3].iter().all(ChildNumber::is_hardened));
        assert!(steps[3..].iter().all(|s| !s.is_hardened()));
        assert_eq!(steps[0].to_raw(), 44 | HARDENED_OFFSET);
        assert_eq!(path.to_string(), "m/44'/1'/2'/0/7");
    }

    #[test]
    fn receive_and_change_chains() {
        assert_eq!(Bip44Path::receive(0, 0, 3).unwrap().change_level(), EXTERNAL_CHAIN);
        assert_eq!(Bip44Path::change(0, 0, 3).unwrap().change_level(), INTERNAL_CHAIN);
    }

    #[test]
    fn parse_hardened_markers() {
        let a: DerivationPath = "m/44'/0h/0H/1/2".parse().unwrap();
        assert_eq!(a, Bip44Path::change(0, 0, 2).unwrap().to_derivation_path());
    }

    #[test]
    fn parse_master() {
        let m: DerivationPath = "m".parse().unwrap();
        assert!(m.is_empty());
        assert_eq!(m.to_string(), "m");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "44'/0'", "m/", "m/x", "m/2147483648", "m/1''", "M/0"] {
            assert!(
                matches!(bad.parse::<DerivationPath>(), Err(WalletError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn bip44_rejects_out_of_range_levels() {
        let cases = [
            (HARDENED_OFFSET, 0, 0, 0),
            (0, HARDENED_OFFSET, 0, 0),
            (0, 0, 2, 0),
            (0, 0, HARDENED_OFFSET, 0),
            (0, 0, 0, HARDENED_OFFSET),
            (0, 0, 0, u32::MAX),
        ];
        for (coin, account, change, index) in cases {
            assert!(
                matches!(
                    Bip44Path::new(coin, account, change, index),
                    Err(WalletError::InvalidPath(_))
                ),
                "{coin}/{account}/{change}/{index} should be rejected"
            );
        }
        let top = Bip44Path::receive(0, 0, HARDENED_OFFSET - 1).unwrap();
        assert!(!top.relative_steps()[1].is_hardened());
    }

    #[test]
    fn top_bit_index_is_hardened() {
        let step = ChildNumber::normal(HARDENED_OFFSET | 5);
        assert!(step.is_hardened());
        assert_eq!(step.index(), 5);
        assert_eq!(step.to_raw(), HARDENED_OFFSET | 5);
    }

    proptest! {
        #[test]
        fn display_parse_roundtrip(
            steps in proptest::collection::vec((0u32..HARDENED_OFFSET, any::<bool>()), 0..8)
        ) {
            let path = DerivationPath::from(
                steps
                    .iter()
                    .map(|&(i, h)| if h { ChildNumber::hardened(i) } else { ChildNumber::normal(i) })
                    .collect::<Vec<_>>(),
            );
            let parsed: DerivationPath = path.to_string().parse().unwrap();
            prop_assert_eq!(parsed, path);
        }

        #[test]
        fn raw_roundtrip(raw in any::<u32>()) {
            prop_assert_eq!(ChildNumber::from_raw(raw).to_raw(), raw);
        }
    }
}
