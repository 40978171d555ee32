//! Verification of client messages and misbehaviour detection

use tracing::{debug, warn};

use crate::{
    block_data::BlockData,
    client_message::ClientMessage,
    client_state::ClientState,
    context::HostContext,
    error::CardanoClientError,
    header::{verify_header, VerifiedHeader},
    misbehaviour::Misbehaviour,
    mithril::{header::MithrilHeader, host_state::extract_ibc_state_root_from_host_state_tx},
    pool::{self, Validator},
    store::{self, ClientStoreRead},
};

/// Verifies a client message without touching the store
///
/// # Errors
/// Returns the error of the failing check.
pub fn verify_client_message<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    message: &ClientMessage,
    ctx: &HostContext,
) -> Result<(), CardanoClientError> {
    match message {
        ClientMessage::HeaderBlockData(block_data) => {
            verify_block_data(store, client_state, block_data).map(|_| ())
        }
        ClientMessage::Misbehaviour(misbehaviour) => {
            verify_misbehaviour(store, client_state, misbehaviour, ctx)
        }
        ClientMessage::MithrilHeader(header) => header.verify(client_state).map(|_| ()),
    }
}

/// The stake pool set allowed to produce blocks in `epoch`
///
/// # Errors
/// Returns [`CardanoClientError::InvalidSposNewEpoch`] for an earlier epoch without a recorded
/// set, or a store error.
pub fn validators_for_epoch<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    epoch: u64,
) -> Result<Vec<Validator>, CardanoClientError> {
    if epoch == client_state.current_epoch {
        return Ok(client_state.current_validator_set.clone());
    }
    pool::derive_new_epoch(store, client_state.current_epoch, epoch)
}

/// Verifies a block:
/// 1. the block data is well formed and belongs to the client's chain and revision
/// 2. the header signatures, VRF proof and body hash check out
/// 3. the header agrees with the block data on height, slot and hash
/// 4. the block producer is in the stake pool set of the block's epoch
///
/// # Errors
/// Returns the error of the failing step. A producer outside the set of a new epoch is
/// [`CardanoClientError::InvalidSposNewEpoch`], outside the current set
/// [`CardanoClientError::InvalidValidatorSet`].
pub fn verify_block_data<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    block_data: &BlockData,
) -> Result<VerifiedHeader, CardanoClientError> {
    block_data.validate_basic()?;
    ensure!(
        block_data.chain_id == client_state.chain_id,
        CardanoClientError::InvalidChainId {
            reason: format!(
                "block data chain id {} does not match client chain id {}",
                block_data.chain_id, client_state.chain_id
            ),
        }
    );
    ensure!(
        block_data.height.revision_number == client_state.latest_height.revision_number,
        CardanoClientError::InvalidHeight {
            reason: format!(
                "block data revision {} does not match client revision {}",
                block_data.height.revision_number, client_state.latest_height.revision_number
            ),
        }
    );

    let verified = verify_header(
        &block_data.header_cbor,
        &block_data.body_cbor,
        &block_data.epoch_nonce,
        client_state.slot_per_kes_period,
    )?;

    ensure!(
        verified.block_number == block_data.height.revision_height,
        CardanoClientError::InvalidBlockDataHeight {
            reason: format!(
                "header block number {} differs from block data height {}",
                verified.block_number, block_data.height
            ),
        }
    );
    ensure!(
        verified.slot == block_data.slot,
        CardanoClientError::InvalidBlockDataSlot {
            reason: format!(
                "header slot {} differs from block data slot {}",
                verified.slot, block_data.slot
            ),
        }
    );
    ensure!(
        block_data.same_hash(&verified.block_hash),
        CardanoClientError::InvalidBlockData(format!(
            "header hashes to {}, block data names {}",
            verified.block_hash, block_data.hash
        ))
    );

    let validators = validators_for_epoch(store, client_state, block_data.epoch_no)?;
    if !pool::contains_vrf(&validators, &verified.vrf_key_hash) {
        if block_data.epoch_no == client_state.current_epoch {
            return Err(CardanoClientError::InvalidValidatorSet(format!(
                "vrf key hash {} is not in the set of epoch {}",
                verified.vrf_key_hash, block_data.epoch_no
            )));
        }
        return Err(CardanoClientError::InvalidSposNewEpoch {
            epoch: block_data.epoch_no,
        });
    }

    debug!(
        height = %block_data.height,
        epoch = block_data.epoch_no,
        "verified block data"
    );
    Ok(verified)
}

/// Verifies that both blocks of the evidence would have been accepted, building on consensus
/// states younger than `valid_after`
///
/// # Errors
/// - [`CardanoClientError::InvalidMisbehaviour`] on malformed evidence
/// - [`CardanoClientError::ConsensusStateNotFound`] if a block has no consensus state
/// - [`CardanoClientError::TrustingPeriodExpired`] if a consensus state is too old
/// - any block verification error
pub fn verify_misbehaviour<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    misbehaviour: &Misbehaviour,
    ctx: &HostContext,
) -> Result<(), CardanoClientError> {
    misbehaviour.validate_basic()?;

    let now = ctx.block_time_secs();
    for block_data in [&misbehaviour.block_data_1, &misbehaviour.block_data_2] {
        let consensus_state = store::must_get_consensus_state(store, block_data.height)?;
        let elapsed = now.saturating_sub(consensus_state.timestamp);
        ensure!(
            elapsed < client_state.valid_after,
            CardanoClientError::TrustingPeriodExpired {
                elapsed,
                allowed: client_state.valid_after,
            }
        );
        verify_block_data(store, client_state, block_data)?;
    }
    Ok(())
}

/// Whether a verified message proves misbehaviour
///
/// # Panics
/// Panics if a stored consensus state cannot be decoded.
#[must_use]
pub fn check_for_misbehaviour<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    message: &ClientMessage,
) -> bool {
    let found = match message {
        ClientMessage::HeaderBlockData(block_data) => check_block_data(store, block_data),
        ClientMessage::Misbehaviour(misbehaviour) => check_misbehaviour(store, misbehaviour),
        ClientMessage::MithrilHeader(header) => check_mithril_header(store, client_state, header),
    };
    if found {
        warn!("misbehaviour detected");
    }
    found
}

fn stored<T>(result: Result<T, CardanoClientError>) -> T {
    result.unwrap_or_else(|e| panic!("corrupted client store: {e}"))
}

fn check_block_data<S: ClientStoreRead + ?Sized>(store: &S, block_data: &BlockData) -> bool {
    let new = block_data.consensus_state();
    let height = block_data.height;

    if let Some(existing) = stored(store::get_consensus_state(store, height)) {
        return existing != new;
    }

    if let Some((_, prev)) = stored(store::previous_consensus_state(store, height)) {
        if prev.timestamp >= new.timestamp || prev.slot >= new.slot {
            return true;
        }
    }
    if let Some((_, next)) = stored(store::next_consensus_state(store, height)) {
        if next.timestamp <= new.timestamp || next.slot <= new.slot {
            return true;
        }
    }
    false
}

/// Whether `block_data` is the block the client installed at its height
fn matches_installed_block<S: ClientStoreRead + ?Sized>(store: &S, block_data: &BlockData) -> bool {
    stored(store::get_consensus_state(store, block_data.height)).is_some()
        && store::get_block_hash(store, block_data.height)
            .is_some_and(|hash| block_data.same_hash(&hash))
}

fn check_misbehaviour<S: ClientStoreRead + ?Sized>(store: &S, misbehaviour: &Misbehaviour) -> bool {
    let (bd1, bd2) = (&misbehaviour.block_data_1, &misbehaviour.block_data_2);
    if bd1.height == bd2.height {
        return !bd1.same_hash(&bd2.hash);
    }
    if !matches_installed_block(store, bd1) || !matches_installed_block(store, bd2) {
        return true;
    }
    bd1.timestamp <= bd2.timestamp
}

/// A Mithril header conflicts when a different root is already recorded at its height
fn check_mithril_header<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    header: &MithrilHeader,
) -> bool {
    let Some(nft) = client_state.host_state_nft.as_ref() else {
        return false;
    };
    let height = header.height(client_state.revision());
    let Some(recorded) = store::get_ibc_state_root(store, height) else {
        return false;
    };
    extract_ibc_state_root_from_host_state_tx(
        &header.host_state_tx_body_cbor,
        &header.host_state_tx_hash,
        header.host_state_tx_output_index,
        &nft.policy_id,
        &nft.token_name,
    )
    .is_ok_and(|root| root.as_slice() != recorded.as_slice())
}
