//! Membership proofs against the UTXO index.
//!
//! A proof is not a Merkle proof but the store path of an indexed datum,
//! `{height}/{category}/{tx_hash}/{output_index}`. The IBC commitment path being proven
//! supplies the suffix (consensus height, port, channel, sequence) of the entry to compare.

use tracing::debug;

use crate::{
    cbor,
    client_state::ClientState,
    context::HostContext,
    counterparty,
    datum::{ChannelDatum, ClientStateDatum, ConnectionEndDatum, ConsensusStateDatum},
    error::CardanoClientError,
    height::Height,
    store::{self, ClientStoreRead},
    utxo::category,
};

/// What a membership proof is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipProof<'a> {
    /// Height of the consensus state the proof was built for
    pub height: Height,
    /// Nanoseconds that must have passed since the consensus state was installed
    pub delay_time_period: u64,
    /// Host blocks that must have passed since the consensus state was installed
    pub delay_block_period: u64,
    /// Store path of the indexed datum
    pub proof: &'a [u8],
    /// IBC commitment path, e.g. `commitments/ports/{port}/channels/{channel}/sequences/{seq}`
    pub path: &'a str,
}

impl MembershipProof<'_> {
    fn proof_path(&self) -> Result<String, CardanoClientError> {
        if self.proof.is_empty() {
            return Err(CardanoClientError::FailedMembershipVerification(
                "proof path cannot be empty".to_string(),
            ));
        }
        std::str::from_utf8(self.proof)
            .map(str::to_lowercase)
            .map_err(|e| {
                CardanoClientError::FailedMembershipVerification(format!(
                    "proof path is not utf-8: {e}"
                ))
            })
    }

    /// The `index`th `/` separated segment of the commitment path
    fn segment(&self, index: usize) -> Result<&str, CardanoClientError> {
        self.path
            .split('/')
            .nth(index)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CardanoClientError::FailedMembershipVerification(format!(
                    "commitment path {:?} has no segment {index}",
                    self.path
                ))
            })
    }

    /// `{port}/{channel}` of a channel scoped commitment path
    fn port_channel(&self) -> Result<String, CardanoClientError> {
        Ok(format!("{}/{}", self.segment(2)?, self.segment(4)?))
    }

    /// `{port}/{channel}/{sequence}` of a packet commitment path
    fn port_channel_sequence(&self) -> Result<String, CardanoClientError> {
        Ok(format!("{}/{}", self.port_channel()?, self.segment(6)?))
    }
}

/// The category of a proof path, tried in a fixed order
fn category_of(proof_path: &str) -> Option<&'static str> {
    [
        category::CLIENT,
        category::CONSENSUS,
        category::CONNECTION,
        category::CHANNEL,
        category::COMMITMENTS,
        category::ACKS,
        category::NEXT_SEQUENCE_RECV,
        category::RECEIPTS,
    ]
    .into_iter()
    .find(|c| proof_path.contains(&format!("/{c}/")))
}

/// Checks the proof height and the delay period
fn verify_height_and_delay<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    ctx: &HostContext,
    proof: &MembershipProof<'_>,
) -> Result<(), CardanoClientError> {
    ensure!(
        proof.height <= client_state.latest_height,
        CardanoClientError::InvalidHeight {
            reason: format!(
                "client state height < proof height ({} < {}), please ensure the client has been updated",
                client_state.latest_height, proof.height
            ),
        }
    );
    store::must_get_consensus_state(store, proof.height)?;
    verify_delay_period_passed(store, ctx, proof)
}

/// Both delays are inclusive: verification is allowed once the host reaches the processed
/// time or height plus the delay.
fn verify_delay_period_passed<S: ClientStoreRead + ?Sized>(
    store: &S,
    ctx: &HostContext,
    proof: &MembershipProof<'_>,
) -> Result<(), CardanoClientError> {
    if proof.delay_time_period != 0 {
        let processed_time = store::get_processed_time(store, proof.height)?;
        let valid_time = processed_time.saturating_add(proof.delay_time_period);
        ensure!(
            ctx.block_time_ns >= valid_time,
            CardanoClientError::DelayPeriodNotPassed {
                reason: format!(
                    "cannot verify packet until time {valid_time}, current time {}",
                    ctx.block_time_ns
                ),
            }
        );
    }
    if proof.delay_block_period != 0 {
        let processed_height = store::get_processed_height(store, proof.height)?;
        let valid_height = Height::new(
            processed_height.revision_number,
            processed_height
                .revision_height
                .saturating_add(proof.delay_block_period),
        );
        ensure!(
            ctx.block_height >= valid_height,
            CardanoClientError::DelayPeriodNotPassed {
                reason: format!(
                    "cannot verify packet until height {valid_height}, current height {}",
                    ctx.block_height
                ),
            }
        );
    }
    Ok(())
}

fn lookup<S: ClientStoreRead + ?Sized>(store: &S, path: &str) -> Result<Vec<u8>, CardanoClientError> {
    store
        .get(store::utxo_key(path).as_bytes())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            CardanoClientError::FailedMembershipVerification(format!(
                "nothing indexed at {path}, please ensure the proof path is correct"
            ))
        })
}

fn bytes_equal(what: &str, stored: &[u8], expected: &[u8]) -> Result<(), CardanoClientError> {
    ensure!(
        stored == expected,
        CardanoClientError::FailedMembershipVerification(format!(
            "{what} bytes do not match, expected {}, got {}",
            hex::encode(expected),
            hex::encode(stored)
        ))
    );
    Ok(())
}

/// Verifies that `value` is committed at `proof.path` on the counterparty
///
/// # Errors
/// - [`CardanoClientError::InvalidHeight`] if the proof height is beyond the latest height
/// - [`CardanoClientError::ConsensusStateNotFound`] if the proof height has no consensus state
/// - [`CardanoClientError::DelayPeriodNotPassed`] if a delay has not passed yet
/// - [`CardanoClientError::FailedMembershipVerification`] if nothing is indexed at the proof
///   path or the indexed value differs
/// - [`CardanoClientError::NotImplemented`] for an unsupported category
pub fn verify_membership<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    ctx: &HostContext,
    proof: &MembershipProof<'_>,
    value: &[u8],
) -> Result<(), CardanoClientError> {
    verify_height_and_delay(store, client_state, ctx, proof)?;
    ensure!(
        !value.is_empty(),
        CardanoClientError::FailedMembershipVerification(
            "expected value cannot be empty".to_string()
        )
    );

    let proof_path = proof.proof_path()?;
    let category = category_of(&proof_path);
    match category {
        Some(category::CLIENT) => {
            let datum: ClientStateDatum = cbor::from_slice(&lookup(store, &proof_path)?)?;
            counterparty::compare_client_state(&datum, value)?;
        }
        Some(category::CONSENSUS) => {
            let path = format!("{proof_path}/{}", proof.segment(3)?);
            let datum: ConsensusStateDatum = cbor::from_slice(&lookup(store, &path)?)?;
            counterparty::compare_consensus_state(&datum, value)?;
        }
        Some(category::CONNECTION) => {
            let datum: ConnectionEndDatum = cbor::from_slice(&lookup(store, &proof_path)?)?;
            counterparty::compare_connection(&datum, value)?;
        }
        Some(category::CHANNEL) => {
            let path = format!("{proof_path}/{}", proof.port_channel()?);
            let datum: ChannelDatum = cbor::from_slice(&lookup(store, &path)?)?;
            counterparty::compare_channel(&datum, value)?;
        }
        Some(category::COMMITMENTS) => {
            let path = format!("{proof_path}/{}", proof.port_channel_sequence()?);
            bytes_equal("commitment", &lookup(store, &path)?, value)?;
        }
        Some(category::ACKS) => {
            let path = format!("{proof_path}/{}", proof.port_channel_sequence()?);
            bytes_equal("acknowledgement", &lookup(store, &path)?, value)?;
        }
        Some(category::NEXT_SEQUENCE_RECV) => {
            let path = format!("{proof_path}/{}", proof.port_channel()?);
            bytes_equal("next sequence recv", &lookup(store, &path)?, value)?;
        }
        _ => {
            return Err(CardanoClientError::NotImplemented(format!(
                "membership of {proof_path}"
            )))
        }
    }

    debug!(height = %proof.height, category, "verified membership");
    Ok(())
}

/// Verifies that nothing is committed at `proof.path` on the counterparty. Only packet
/// receipts can be proven absent.
///
/// # Errors
/// - the height and delay errors of [`verify_membership`]
/// - [`CardanoClientError::FailedNonMembershipVerification`] if a receipt is indexed
/// - [`CardanoClientError::NotImplemented`] for any other category
pub fn verify_non_membership<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    ctx: &HostContext,
    proof: &MembershipProof<'_>,
) -> Result<(), CardanoClientError> {
    verify_height_and_delay(store, client_state, ctx, proof)?;

    let proof_path = proof.proof_path()?;
    if category_of(&proof_path) != Some(category::RECEIPTS) {
        return Err(CardanoClientError::NotImplemented(format!(
            "non-membership of {proof_path}"
        )));
    }

    let path = format!("{proof_path}/{}", proof.port_channel_sequence()?);
    if store.get(store::utxo_key(&path).as_bytes()).is_some() {
        return Err(CardanoClientError::FailedNonMembershipVerification(format!(
            "packet receipt exists at {path}"
        )));
    }

    debug!(height = %proof.height, "verified receipt absence");
    Ok(())
}
