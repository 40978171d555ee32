//! This module contains the sudo message handlers

use cardano_light_client::{
    client_message::ClientMessage,
    membership::{self, MembershipProof},
    update,
};
use cosmwasm_std::{to_json_binary, Binary, Deps, DepsMut, Env, Event, Response};
use tracing::debug;

use crate::{
    msg::{
        MerklePath, UpdateStateMsg, UpdateStateOnMisbehaviourMsg, UpdateStateResult,
        VerifyMembershipMsg, VerifyNonMembershipMsg,
    },
    state::{get_client_state, host_context, HostStore, HostStoreMut},
    ContractError,
};

/// Name of the event listing the UTXO datums indexed by an update
pub const UTXO_INDEXED_EVENT: &str = "cardano_utxo_indexed";
/// Attribute of [`UTXO_INDEXED_EVENT`] holding one indexed store key
pub const UTXO_INDEXED_KEY_ATTRIBUTE: &str = "key";

/// The IBC path of a merkle path: its last key, after the commitment prefix
fn ibc_path(merkle_path: &MerklePath) -> Result<&str, ContractError> {
    let key = merkle_path
        .key_path
        .last()
        .ok_or_else(|| ContractError::InvalidMerklePath("empty key path".to_string()))?;
    std::str::from_utf8(key).map_err(|e| ContractError::InvalidMerklePath(e.to_string()))
}

/// Verify the membership of a value at a given height
/// # Errors
/// Returns an error if the membership proof verification fails
/// # Returns
/// An empty response
#[allow(clippy::needless_pass_by_value)]
pub fn verify_membership(
    deps: Deps,
    env: &Env,
    verify_membership_msg: VerifyMembershipMsg,
) -> Result<Binary, ContractError> {
    let client_state = get_client_state(deps.storage)?;
    let proof = MembershipProof {
        height: verify_membership_msg.height.into(),
        delay_time_period: verify_membership_msg.delay_time_period,
        delay_block_period: verify_membership_msg.delay_block_period,
        proof: &verify_membership_msg.proof,
        path: ibc_path(&verify_membership_msg.merkle_path)?,
    };

    membership::verify_membership(
        &HostStore(deps.storage),
        &client_state,
        &host_context(env),
        &proof,
        &verify_membership_msg.value,
    )
    .map_err(ContractError::VerifyMembershipFailed)?;

    Ok(Binary::default())
}

/// Verify the non-membership (absence) of a value at a given height
/// # Errors
/// Returns an error if the non-membership proof verification fails
/// # Returns
/// An empty response
#[allow(clippy::needless_pass_by_value)]
pub fn verify_non_membership(
    deps: Deps,
    env: &Env,
    verify_non_membership_msg: VerifyNonMembershipMsg,
) -> Result<Binary, ContractError> {
    let client_state = get_client_state(deps.storage)?;
    let proof = MembershipProof {
        height: verify_non_membership_msg.height.into(),
        delay_time_period: verify_non_membership_msg.delay_time_period,
        delay_block_period: verify_non_membership_msg.delay_block_period,
        proof: &verify_non_membership_msg.proof,
        path: ibc_path(&verify_non_membership_msg.merkle_path)?,
    };

    membership::verify_non_membership(
        &HostStore(deps.storage),
        &client_state,
        &host_context(env),
        &proof,
    )
    .map_err(ContractError::VerifyNonMembershipFailed)?;

    Ok(Binary::default())
}

/// Update the state of the light client
/// This function is always called after the verify client message, so
/// we can assume the client message is valid
/// # Errors
/// Returns an error if deserialization fails or if the light client update logic fails
/// # Returns
/// The updated heights as data, and a [`UTXO_INDEXED_EVENT`] when UTXO datums were indexed
#[allow(clippy::needless_pass_by_value)]
pub fn update_state(
    deps: DepsMut,
    env: &Env,
    update_state_msg: UpdateStateMsg,
) -> Result<Response, ContractError> {
    let client_message = ClientMessage::decode(&update_state_msg.client_message)
        .map_err(ContractError::DeserializeClientMessageFailed)?;
    let client_state = get_client_state(deps.storage)?;

    let outcome = update::update_state(
        &mut HostStoreMut(deps.storage),
        &client_state,
        &client_message,
        &host_context(env),
    )
    .map_err(ContractError::UpdateStateFailed)?;

    let data = to_json_binary(&UpdateStateResult {
        heights: outcome.heights.into_iter().map(Into::into).collect(),
    })?;
    let mut response = Response::default().set_data(data);
    if !outcome.indexed_keys.is_empty() {
        debug!(keys = outcome.indexed_keys.len(), "emitting indexed utxo keys");
        response = response.add_event(
            Event::new(UTXO_INDEXED_EVENT).add_attributes(
                outcome
                    .indexed_keys
                    .into_iter()
                    .map(|key| (UTXO_INDEXED_KEY_ATTRIBUTE, key)),
            ),
        );
    }
    Ok(response)
}

/// Freeze the light client on misbehaviour
/// # Errors
/// Returns an error if the client message or the client state cannot be decoded, or the
/// frozen client state cannot be stored
#[allow(clippy::needless_pass_by_value)]
pub fn misbehaviour(
    deps: DepsMut,
    msg: UpdateStateOnMisbehaviourMsg,
) -> Result<Binary, ContractError> {
    ClientMessage::decode(&msg.client_message)
        .map_err(ContractError::DeserializeClientMessageFailed)?;
    let client_state = get_client_state(deps.storage)?;

    update::update_state_on_misbehaviour(&mut HostStoreMut(deps.storage), &client_state)
        .map_err(ContractError::UpdateStateOnMisbehaviourFailed)?;

    Ok(Binary::default())
}
