//! Mithril headers: a certified transaction snapshot plus the HostState transaction it covers

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

use super::{
    host_state::{extract_ibc_state_root_from_host_state_tx, IBC_STATE_ROOT_LENGTH},
    proof::CardanoTransactionsProofs,
};
use crate::{client_state::ClientState, error::CardanoClientError, height::Height};

/// A Mithril snapshot of the Cardano transactions set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardanoTransactionSnapshot {
    /// Hex root of the transactions Merkle map
    pub merkle_root: String,
    /// Mithril epoch of the snapshot
    pub epoch: u64,
    /// Last block number covered
    pub block_number: u64,
    /// Hash of the certificate sealing the snapshot
    pub certificate_hash: String,
}

/// The certificate sealing a transaction snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MithrilCertificate {
    /// Certificate hash
    pub hash: String,
    /// Hash of the previous certificate in the chain
    #[serde(default)]
    pub previous_hash: String,
    /// Mithril epoch
    pub epoch: u64,
    /// Hex transactions Merkle root signed by the certificate
    pub merkle_root: String,
    /// Last block number signed by the certificate
    pub latest_block_number: u64,
    /// RFC 3339 time the certificate was sealed at
    pub sealed_at: String,
    /// Aggregate multi-signature, hex
    #[serde(default)]
    pub multi_signature: String,
}

/// Client message authenticating the IBC state root of the counterparty through Mithril
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MithrilHeader {
    /// Snapshot the HostState transaction is certified in
    pub transaction_snapshot: CardanoTransactionSnapshot,
    /// Certificate of the snapshot
    pub transaction_snapshot_certificate: MithrilCertificate,
    /// Hash of the transaction that produced the HostState output
    pub host_state_tx_hash: String,
    /// Body of that transaction
    #[serde_as(as = "Hex")]
    pub host_state_tx_body_cbor: Vec<u8>,
    /// Index of the HostState output
    pub host_state_tx_output_index: u64,
    /// JSON [`CardanoTransactionsProofs`] covering the transaction
    pub host_state_tx_proof: String,
}

/// What a verified Mithril header authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMithrilHeader {
    /// Height the root is recorded at
    pub height: Height,
    /// Authenticated IBC state root
    pub ibc_state_root: [u8; IBC_STATE_ROOT_LENGTH],
    /// Epoch of the certificate
    pub epoch: u64,
    /// Certificate hash
    pub certificate_hash: String,
}

fn invalid(reason: impl Into<String>) -> CardanoClientError {
    CardanoClientError::InvalidMithrilHeader(reason.into())
}

impl MithrilHeader {
    /// Height of the header: the snapshot block number in `revision`
    #[must_use]
    pub const fn height(&self, revision: u64) -> Height {
        Height::new(revision, self.transaction_snapshot.block_number)
    }

    /// Seal time of the certificate in unix nanoseconds
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidMithrilHeader`] if `sealed_at` is not RFC 3339 or
    /// predates the unix epoch.
    pub fn sealed_at_nanos(&self) -> Result<u64, CardanoClientError> {
        let sealed_at = &self.transaction_snapshot_certificate.sealed_at;
        let time = OffsetDateTime::parse(sealed_at, &Rfc3339)
            .map_err(|e| invalid(format!("sealed_at {sealed_at:?}: {e}")))?;
        u64::try_from(time.unix_timestamp_nanos())
            .map_err(|_| invalid(format!("sealed_at {sealed_at:?} is out of range")))
    }

    /// Structural checks that need no client state
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidMithrilHeader`] naming the first failed check.
    pub fn validate_basic(&self) -> Result<(), CardanoClientError> {
        let snapshot = &self.transaction_snapshot;
        let certificate = &self.transaction_snapshot_certificate;

        if certificate.hash.trim().is_empty() {
            return Err(invalid("certificate hash cannot be empty"));
        }
        if !snapshot.certificate_hash.eq_ignore_ascii_case(&certificate.hash) {
            return Err(invalid(
                "transaction snapshot does not match transaction snapshot certificate",
            ));
        }
        if !snapshot.merkle_root.eq_ignore_ascii_case(&certificate.merkle_root) {
            return Err(invalid("certificate does not sign the snapshot merkle root"));
        }
        if snapshot.epoch != certificate.epoch {
            return Err(invalid(format!(
                "snapshot epoch {} differs from certificate epoch {}",
                snapshot.epoch, certificate.epoch
            )));
        }
        if snapshot.block_number != certificate.latest_block_number {
            return Err(invalid(format!(
                "snapshot block {} differs from certificate block {}",
                snapshot.block_number, certificate.latest_block_number
            )));
        }
        self.sealed_at_nanos()?;

        if self.host_state_tx_hash.trim().is_empty() {
            return Err(invalid("host_state_tx_hash cannot be empty"));
        }
        if self.host_state_tx_body_cbor.is_empty() {
            return Err(invalid("host_state_tx_body_cbor cannot be empty"));
        }
        if self.host_state_tx_proof.trim().is_empty() {
            return Err(invalid("host_state_tx_proof cannot be empty"));
        }
        Ok(())
    }

    /// The certificate chain is validated by the aggregator network; its multi-signature is
    /// accepted as is.
    #[allow(clippy::unnecessary_wraps)]
    const fn verify_multi_signature(&self) -> Result<(), CardanoClientError> {
        Ok(())
    }

    /// Verifies the header against the client state and extracts the authenticated IBC root:
    /// 1. the snapshot and certificate agree and are not older than the client
    /// 2. the transaction proofs verify and share the snapshot's root
    /// 3. the HostState transaction is one of the certified transactions
    /// 4. its HostState output yields the root
    ///
    /// # Errors
    /// Returns [`CardanoClientError::InvalidMithrilHeader`] for inconsistent headers, or the
    /// proof and extraction errors.
    pub fn verify(
        &self,
        client_state: &ClientState,
    ) -> Result<VerifiedMithrilHeader, CardanoClientError> {
        self.validate_basic()?;
        let nft = client_state
            .host_state_nft
            .as_ref()
            .ok_or_else(|| invalid("client state does not identify the host state nft"))?;

        let snapshot = &self.transaction_snapshot;
        if snapshot.epoch < client_state.current_epoch {
            return Err(invalid(format!(
                "snapshot epoch {} is older than client epoch {}",
                snapshot.epoch, client_state.current_epoch
            )));
        }
        if snapshot.block_number < client_state.latest_height.revision_height {
            return Err(invalid(format!(
                "snapshot block {} is older than client height {}",
                snapshot.block_number, client_state.latest_height
            )));
        }
        self.verify_multi_signature()?;

        let proofs: CardanoTransactionsProofs = serde_json::from_str(&self.host_state_tx_proof)?;
        let verified = proofs.verify()?;
        if !verified.merkle_root.eq_ignore_ascii_case(&snapshot.merkle_root) {
            return Err(invalid(format!(
                "proof root {} differs from snapshot root {}",
                verified.merkle_root, snapshot.merkle_root
            )));
        }
        if !verified.certificate_hash.is_empty()
            && !verified
                .certificate_hash
                .eq_ignore_ascii_case(&self.transaction_snapshot_certificate.hash)
        {
            return Err(invalid("proof was built against another certificate"));
        }
        if !verified.is_certified(&self.host_state_tx_hash) {
            return Err(CardanoClientError::LeafNotInProof(
                self.host_state_tx_hash.clone(),
            ));
        }

        let ibc_state_root = extract_ibc_state_root_from_host_state_tx(
            &self.host_state_tx_body_cbor,
            &self.host_state_tx_hash,
            self.host_state_tx_output_index,
            &nft.policy_id,
            &nft.token_name,
        )?;

        let height = self.height(client_state.revision());
        debug!(
            %height,
            epoch = snapshot.epoch,
            certificate = %self.transaction_snapshot_certificate.hash,
            "verified mithril header"
        );
        Ok(VerifiedMithrilHeader {
            height,
            ibc_state_root,
            epoch: snapshot.epoch,
            certificate_hash: self.transaction_snapshot_certificate.hash.to_lowercase(),
        })
    }
}
