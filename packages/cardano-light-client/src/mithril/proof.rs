//! Certified transaction proofs: block range keyed maps of Merkle mountain ranges

use serde::{Deserialize, Serialize};

use super::mmr::{MKProof, MKTreeNode};
use crate::error::CardanoClientError;

/// A half open range of block numbers `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    /// First block number of the range
    pub start: u64,
    /// Block number following the range
    pub end: u64,
}

impl From<BlockRange> for MKTreeNode {
    fn from(range: BlockRange) -> Self {
        Self::new(format!("{}-{}", range.start, range.end).into_bytes())
    }
}

/// A proof over a map of block ranges, each range holding its own transaction tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MKMapProof {
    /// Proof over the `range || range_root` leaves of the map
    pub master_proof: MKProof,
    /// Proofs inside the ranges, keyed by range
    #[serde(default)]
    pub sub_proofs: Vec<(BlockRange, MKMapProof)>,
}

impl MKMapProof {
    /// The root of the map
    #[must_use]
    pub const fn compute_root(&self) -> &MKTreeNode {
        self.master_proof.root()
    }

    /// Verifies every sub proof, the master proof, and that the master proof commits to each
    /// sub proof root under its range
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidMkProof`] or [`CardanoClientError::LeafNotInProof`].
    pub fn verify(&self) -> Result<(), CardanoClientError> {
        for (_, sub_proof) in &self.sub_proofs {
            sub_proof.verify()?;
        }
        self.master_proof.verify()?;
        for (range, sub_proof) in &self.sub_proofs {
            let leaf = MKTreeNode::from(*range).merge(sub_proof.compute_root());
            self.master_proof.contains(&[leaf])?;
        }
        Ok(())
    }

    /// Whether `leaf` is proven by this map or one of its ranges
    #[must_use]
    pub fn contains(&self, leaf: &MKTreeNode) -> bool {
        self.master_proof
            .contains(std::slice::from_ref(leaf))
            .is_ok()
            || self.sub_proofs.iter().any(|(_, p)| p.contains(leaf))
    }
}

/// A set of transactions proven by one map proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoTransactionsSetProof {
    /// Hex transaction hashes
    pub transactions_hashes: Vec<String>,
    /// Map proof covering the transactions
    pub proof: MKMapProof,
}

impl CardanoTransactionsSetProof {
    /// Verifies the proof and that every transaction is one of its leaves
    ///
    /// # Errors
    /// Returns [`CardanoClientError::LeafNotInProof`] for a transaction outside the proof, or
    /// the proof verification error.
    pub fn verify(&self) -> Result<(), CardanoClientError> {
        self.proof.verify()?;
        for tx_hash in &self.transactions_hashes {
            if !self.proof.contains(&transaction_leaf(tx_hash)) {
                return Err(CardanoClientError::LeafNotInProof(tx_hash.clone()));
            }
        }
        Ok(())
    }

    /// Hex root of the proof
    #[must_use]
    pub fn merkle_root(&self) -> String {
        self.proof.compute_root().to_hex()
    }
}

/// Proofs of transaction inclusion returned by a Mithril aggregator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardanoTransactionsProofs {
    /// Hash of the certificate the proofs were built against, if stated
    #[serde(default)]
    pub certificate_hash: String,
    /// Proven transaction sets
    pub certified_transactions: Vec<CardanoTransactionsSetProof>,
    /// Requested transactions the aggregator could not prove
    #[serde(default)]
    pub non_certified_transactions: Vec<String>,
    /// Highest block number covered by the proofs
    #[serde(default)]
    pub latest_block_number: u64,
}

/// The outcome of [`CardanoTransactionsProofs::verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCardanoTransactions {
    /// Hash of the certificate the proofs were built against
    pub certificate_hash: String,
    /// Hex root shared by every proof
    pub merkle_root: String,
    /// Every proven transaction hash
    pub certified_transactions: Vec<String>,
    /// Highest block number covered by the proofs
    pub latest_block_number: u64,
}

impl VerifiedCardanoTransactions {
    /// Whether `tx_hash` was proven, ignoring case
    #[must_use]
    pub fn is_certified(&self, tx_hash: &str) -> bool {
        self.certified_transactions
            .iter()
            .any(|h| h.eq_ignore_ascii_case(tx_hash))
    }
}

impl CardanoTransactionsProofs {
    /// Verifies every set proof and that they share one root
    ///
    /// # Errors
    /// - [`CardanoClientError::NoCertifiedTransaction`] if there is no set proof
    /// - [`CardanoClientError::InvalidMkProof`] if the roots differ or a proof is invalid
    pub fn verify(&self) -> Result<VerifiedCardanoTransactions, CardanoClientError> {
        let mut merkle_root: Option<String> = None;
        for set in &self.certified_transactions {
            set.verify()?;
            let root = set.merkle_root();
            match &merkle_root {
                None => merkle_root = Some(root),
                Some(expected) if *expected != root => {
                    return Err(CardanoClientError::InvalidMkProof(format!(
                        "non matching merkle roots {expected} and {root}"
                    )));
                }
                Some(_) => {}
            }
        }
        let merkle_root = merkle_root.ok_or(CardanoClientError::NoCertifiedTransaction)?;

        Ok(VerifiedCardanoTransactions {
            certificate_hash: self.certificate_hash.clone(),
            merkle_root,
            certified_transactions: self
                .certified_transactions
                .iter()
                .flat_map(|set| set.transactions_hashes.iter().cloned())
                .collect(),
            latest_block_number: self.latest_block_number,
        })
    }
}

/// The leaf committing to a transaction: the bytes of its lowercase hex hash
#[must_use]
pub fn transaction_leaf(tx_hash: &str) -> MKTreeNode {
    MKTreeNode::from(tx_hash.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transactions_proof;

    const TX_A: &str = "aa00000000000000000000000000000000000000000000000000000000000001";
    const TX_B: &str = "bb00000000000000000000000000000000000000000000000000000000000002";

    #[test]
    fn range_key_is_start_dash_end() {
        let node = MKTreeNode::from(BlockRange { start: 15, end: 30 });
        assert_eq!(node.hash, b"15-30".to_vec());
    }

    #[test]
    fn two_level_map_proof_verifies() {
        let proofs = transactions_proof(&[TX_A, TX_B]);
        let verified = proofs.verify().unwrap();
        assert_eq!(verified.certified_transactions, vec![TX_A, TX_B]);
        assert!(verified.is_certified(&TX_A.to_uppercase()));
        assert!(!verified.is_certified("cc"));
        assert_eq!(
            verified.merkle_root,
            proofs.certified_transactions[0].merkle_root()
        );
    }

    #[test]
    fn sub_root_must_be_committed_by_master() {
        let mut proofs = transactions_proof(&[TX_A, TX_B]);
        let set = &mut proofs.certified_transactions[0];
        set.proof.sub_proofs[0].0 = BlockRange { start: 0, end: 1 };
        assert!(matches!(
            proofs.verify(),
            Err(CardanoClientError::LeafNotInProof(_))
        ));
    }

    #[test]
    fn unproven_transaction_is_rejected() {
        let mut proofs = transactions_proof(&[TX_A, TX_B]);
        proofs.certified_transactions[0]
            .transactions_hashes
            .push("cc".repeat(32));
        assert!(matches!(
            proofs.verify(),
            Err(CardanoClientError::LeafNotInProof(_))
        ));
    }

    #[test]
    fn sets_must_share_a_root() {
        let mut proofs = transactions_proof(&[TX_A, TX_B]);
        let other = transactions_proof(&[TX_B, TX_A]);
        proofs
            .certified_transactions
            .push(other.certified_transactions[0].clone());
        assert!(matches!(
            proofs.verify(),
            Err(CardanoClientError::InvalidMkProof(_))
        ));
    }

    #[test]
    fn empty_proofs_certify_nothing() {
        assert!(matches!(
            CardanoTransactionsProofs::default().verify(),
            Err(CardanoClientError::NoCertifiedTransaction)
        ));
    }

    #[test]
    fn proofs_survive_json() {
        let proofs = transactions_proof(&[TX_A, TX_B]);
        let json = serde_json::to_vec(&proofs).unwrap();
        let back: CardanoTransactionsProofs = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, proofs);
        back.verify().unwrap();
    }
}
