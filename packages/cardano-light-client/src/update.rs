//! State transitions of the client: initialization, updates and freezing

use tracing::{debug, info, warn};

use crate::{
    block::{self, BlockOutput},
    block_data::BlockData,
    client_message::ClientMessage,
    client_state::ClientState,
    consensus_state::ConsensusState,
    context::HostContext,
    error::CardanoClientError,
    header::PraosHeader,
    height::Height,
    mithril::header::MithrilHeader,
    pool,
    store::{self, ClientStore},
    utxo,
};

/// What an update wrote
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Heights of the consensus states the update covers
    pub heights: Vec<Height>,
    /// Store keys of the UTXO datums indexed by the update
    pub indexed_keys: Vec<String>,
}

impl UpdateOutcome {
    fn at(height: Height) -> Self {
        Self {
            heights: vec![height],
            indexed_keys: Vec::new(),
        }
    }
}

/// Stores the initial client and consensus state, and the stake pool sets of the current and
/// next epoch
///
/// # Errors
/// Returns a validation error, [`CardanoClientError::ClientFrozen`] for a frozen client state,
/// or an encoding error.
pub fn initialize<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
    consensus_state: &ConsensusState,
    checksum: Vec<u8>,
    ctx: &HostContext,
) -> Result<(), CardanoClientError> {
    client_state.validate()?;
    consensus_state.validate()?;
    ensure!(!client_state.is_frozen(), CardanoClientError::ClientFrozen);

    let height = client_state.latest_height;
    store::set_wasm_client_state(store, client_state, checksum)?;
    store::set_consensus_state(store, height, consensus_state)?;
    store::set_consensus_metadata(store, height, ctx.block_time_ns, ctx.block_height);

    let epoch = client_state.current_epoch;
    store::set_client_spos(store, epoch, &client_state.current_validator_set)?;
    store::set_client_spos(store, epoch + 1, &client_state.next_validator_set)?;

    info!(
        %height,
        chain_id = %client_state.chain_id,
        epoch,
        "initialized cardano client"
    );
    Ok(())
}

/// Applies a verified client message
///
/// # Errors
/// Returns [`CardanoClientError::InvalidClientType`] for misbehaviour, which must go through
/// [`update_state_on_misbehaviour`], or the error of the failing step.
pub fn update_state<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
    message: &ClientMessage,
    ctx: &HostContext,
) -> Result<UpdateOutcome, CardanoClientError> {
    match message {
        ClientMessage::HeaderBlockData(block_data) => {
            update_with_block(store, client_state, block_data, ctx)
        }
        ClientMessage::MithrilHeader(header) => update_with_mithril(store, client_state, header),
        ClientMessage::Misbehaviour(_) => Err(CardanoClientError::InvalidClientType(
            "misbehaviour cannot update state, submit it as misbehaviour".to_string(),
        )),
    }
}

/// Installs a block:
/// 1. advances the latest height, and rolls the stake pool set to the block's epoch when it
///    differs from the current one
/// 2. journals the pool certificates of the block
/// 3. stores the consensus state, its metadata and the block hash
/// 4. indexes the IBC datums of the block
/// 5. prunes the earliest consensus state once it falls out of the trusting period
fn update_with_block<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
    block_data: &BlockData,
    ctx: &HostContext,
) -> Result<UpdateOutcome, CardanoClientError> {
    let height = block_data.height;
    if store::get_consensus_state(store, height)?.is_some() {
        debug!(%height, "consensus state already installed, skipping update");
        return Ok(UpdateOutcome::at(height));
    }

    // decode the whole body before writing anything
    let txs = block::decode_block_body(&block_data.body_cbor)?;
    let BlockOutput {
        utxos,
        registrations,
        retirements,
    } = block::extract_block_output(&txs)?;

    let mut new_client_state = client_state.clone();
    if height > new_client_state.latest_height {
        new_client_state.latest_height = height;
    }

    let new_epoch = block_data.epoch_no;
    let rolled = new_epoch != client_state.current_epoch;
    if rolled {
        let producer = PraosHeader::decode(&block_data.header_cbor)?.vrf_key_hash();
        new_client_state.current_validator_set =
            pool::roll_epoch(store, client_state.current_epoch, new_epoch, &producer)?;
        new_client_state.current_epoch = new_epoch;
    }

    pool::schedule_registrations(store, &registrations, new_epoch, height.revision_height)?;
    pool::schedule_retirements(store, &retirements, height.revision_height)?;

    if rolled {
        new_client_state.next_validator_set =
            pool::derive_new_epoch(store, new_epoch, new_epoch + 1)?;
    }

    store::set_client_state(store, &new_client_state)?;
    store::set_consensus_state(store, height, &block_data.consensus_state())?;
    store::set_consensus_metadata(store, height, ctx.block_time_ns, ctx.block_height);
    store::set_block_hash(store, height, &block_data.hash);

    let indexed_keys = utxo::index_utxos(store, &new_client_state.token_configs, height, &utxos)?;

    prune_oldest_consensus_state(store, &new_client_state, ctx)?;

    info!(
        %height,
        epoch = new_client_state.current_epoch,
        latest_height = %new_client_state.latest_height,
        indexed = indexed_keys.len(),
        "installed cardano block"
    );
    Ok(UpdateOutcome {
        heights: vec![height],
        indexed_keys,
    })
}

/// Removes the earliest consensus state if it expired. The latest one is never removed.
fn prune_oldest_consensus_state<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
    ctx: &HostContext,
) -> Result<(), CardanoClientError> {
    let Some((height, consensus_state)) = store::earliest_consensus_state(store)? else {
        return Ok(());
    };
    let expires_at = consensus_state
        .timestamp
        .saturating_add(client_state.trusting_period);
    if height != client_state.latest_height && expires_at <= ctx.block_time_secs() {
        store::delete_consensus_state(store, height);
        info!(%height, "pruned expired consensus state");
    }
    Ok(())
}

/// Records the IBC state root authenticated by a Mithril header. A header whose certificate
/// was already accepted for its epoch is a no-op.
fn update_with_mithril<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
    header: &MithrilHeader,
) -> Result<UpdateOutcome, CardanoClientError> {
    let verified = header.verify(client_state)?;
    let height = verified.height;

    let accepted = store::get_mithril_certificate(store, verified.epoch)
        .is_some_and(|hash| hash.eq_ignore_ascii_case(&verified.certificate_hash));
    if accepted {
        debug!(%height, epoch = verified.epoch, "mithril certificate already accepted");
        return Ok(UpdateOutcome::at(height));
    }

    store::set_ibc_state_root(store, height, &verified.ibc_state_root);
    store::set_mithril_certificate(store, verified.epoch, &verified.certificate_hash);

    info!(
        %height,
        epoch = verified.epoch,
        root = %hex::encode(verified.ibc_state_root),
        "recorded mithril ibc state root"
    );
    Ok(UpdateOutcome::at(height))
}

/// Freezes the client
///
/// # Errors
/// Returns an error if the client state cannot be stored.
pub fn update_state_on_misbehaviour<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
) -> Result<(), CardanoClientError> {
    let mut frozen = client_state.clone();
    frozen.frozen_height = Height::frozen();
    store::set_client_state(store, &frozen)?;
    warn!(chain_id = %client_state.chain_id, "client frozen on misbehaviour");
    Ok(())
}
