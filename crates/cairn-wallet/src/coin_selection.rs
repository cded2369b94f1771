//! Order-preserving greedy coin selection.
//!
//! UTXOs are taken in the order the ledger returned them until the running
//! total strictly exceeds the amount being sent. The strict comparison
//! leaves room for the fee, which is deducted from change later.

use tracing::debug;

use cairn_core::types::Utxo;

use crate::error::WalletError;

/// Result of coin selection: which UTXOs to spend and their total value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected UTXOs, in the order they were supplied.
    pub selected: Vec<Utxo>,
    /// Total value of the selected UTXOs in base units.
    pub total: u64,
}

/// Greedy first-fit coin selector.
pub struct CoinSelector;

impl CoinSelector {
    /// Select a prefix of `utxos` whose total exceeds `amount`.
    ///
    /// # Errors
    /// - [`WalletError::InvalidAmount`] if `amount` is zero or the running
    ///   total overflows
    /// - [`WalletError::InsufficientFunds`] if the whole list does not exceed
    ///   `amount` (including an empty list)
    pub fn select(utxos: &[Utxo], amount: u64) -> Result<CoinSelection, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }

        let mut total: u64 = 0;
        for (i, utxo) in utxos.iter().enumerate() {
            total = total
                .checked_add(utxo.amount)
                .ok_or_else(|| WalletError::InvalidAmount("utxo total overflows".into()))?;
            if total > amount {
                debug!(inputs = i + 1, total, amount, "coins selected");
                return Ok(CoinSelection {
                    selected: utxos[..=i].to_vec(),
                    total,
                });
            }
        }

        Err(WalletError::InsufficientFunds {
            have: total,
            need: amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::types::{OutPoint, Txid};
    use proptest::prelude::*;

    fn utxo(n: u8, amount: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint {
                txid: Txid([n; 32]),
                vout: n as u32,
            },
            script_pubkey: vec![0x00, 0x14],
            amount,
            confirmations: 1,
        }
    }

    fn utxos(amounts: &[u64]) -> Vec<Utxo> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| utxo(i as u8, a))
            .collect()
    }

    #[test]
    fn selects_prefix_until_strictly_greater() {
        let sel = CoinSelector::select(&utxos(&[5, 5, 5]), 8).unwrap();
        assert_eq!(sel.selected.len(), 2);
        assert_eq!(sel.total, 10);
    }

    #[test]
    fn equal_total_is_not_enough() {
        let sel = CoinSelector::select(&utxos(&[5, 5, 5]), 10).unwrap();
        assert_eq!(sel.selected.len(), 3);
        assert_eq!(sel.total, 15);
    }

    #[test]
    fn exact_balance_is_insufficient() {
        let err = CoinSelector::select(&utxos(&[5, 5, 5]), 15).unwrap_err();
        assert_eq!(err, WalletError::InsufficientFunds { have: 15, need: 15 });
    }

    #[test]
    fn preserves_ledger_order() {
        let list = utxos(&[1, 100, 2]);
        let sel = CoinSelector::select(&list, 50).unwrap();
        assert_eq!(sel.selected, list[..2].to_vec());
    }

    #[test]
    fn first_utxo_alone_suffices() {
        let sel = CoinSelector::select(&utxos(&[100, 1, 1]), 99).unwrap();
        assert_eq!(sel.selected.len(), 1);
    }

    #[test]
    fn empty_list_is_insufficient() {
        let err = CoinSelector::select(&[], 1).unwrap_err();
        assert_eq!(err, WalletError::InsufficientFunds { have: 0, need: 1 });
    }

    #[test]
    fn zero_amount_rejected() {
        assert!(matches!(
            CoinSelector::select(&utxos(&[5]), 0),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn overflow_rejected() {
        assert!(matches!(
            CoinSelector::select(&utxos(&[u64::MAX, 1]), u64::MAX),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    proptest! {
        #[test]
        fn selection_is_minimal_prefix(
            amounts in proptest::collection::vec(1u64..1_000_000, 0..20),
            target in 1u64..5_000_000,
        ) {
            let list = utxos(&amounts);
            match CoinSelector::select(&list, target) {
                Ok(sel) => {
                    let n = sel.selected.len();
                    prop_assert!(sel.total > target);
                    prop_assert_eq!(&sel.selected[..], &list[..n]);
                    let without_last: u64 = amounts[..n - 1].iter().sum();
                    prop_assert!(without_last <= target);
                }
                Err(WalletError::InsufficientFunds { have, need }) => {
                    prop_assert_eq!(have, amounts.iter().sum::<u64>());
                    prop_assert!(have <= need);
                }
                Err(e) => prop_assert!(false, "unexpected error {e}"),
            }
        }
    }
}
