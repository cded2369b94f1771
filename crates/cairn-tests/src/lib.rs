//! Cross-crate integration tests for the Cairn wallet core.
//!
//! [`helpers`] provides an in-memory ledger that serves UTXOs, validates
//! broadcast transactions and applies them, so spends can be exercised end
//! to end without a node.

pub mod helpers;
