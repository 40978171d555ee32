//! This module contains the instantiate helper functions

use cardano_light_client::{
    client_state::ClientState as CardanoClientState,
    consensus_state::ConsensusState as CardanoConsensusState, update,
};
use cosmwasm_std::{Env, Storage};

use crate::{
    msg::InstantiateMsg,
    state::{host_context, HostStoreMut},
    ContractError,
};

/// Initializes the client state, the initial consensus state and the stake pool sets of the
/// current and next epoch
/// # Errors
/// Will return an error if the client state or consensus state cannot be deserialized, or is
/// rejected by the client.
#[allow(clippy::needless_pass_by_value)]
pub fn client(storage: &mut dyn Storage, env: &Env, msg: InstantiateMsg) -> Result<(), ContractError> {
    let client_state: CardanoClientState = serde_json::from_slice(&msg.client_state)
        .map_err(ContractError::DeserializeClientStateFailed)?;
    let consensus_state: CardanoConsensusState = serde_json::from_slice(&msg.consensus_state)
        .map_err(ContractError::DeserializeConsensusStateFailed)?;

    update::initialize(
        &mut HostStoreMut(storage),
        &client_state,
        &consensus_state,
        msg.checksum.into(),
        &host_context(env),
    )
    .map_err(ContractError::InstantiateFailed)
}
