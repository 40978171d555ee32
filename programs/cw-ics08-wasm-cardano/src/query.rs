//! This module contains the query message handlers

use cardano_light_client::{client_message::ClientMessage, status, verify};
use cosmwasm_std::{to_json_binary, Binary, Deps, Env};

use crate::{
    msg::{
        CheckForMisbehaviourMsg, CheckForMisbehaviourResult, StatusResult, TimestampAtHeightMsg,
        TimestampAtHeightResult, VerifyClientMessageMsg,
    },
    state::{get_client_state, host_context, HostStore},
    ContractError,
};

/// Verifies the client message: a block, misbehaviour evidence or a Mithril header
/// # Errors
/// Returns an error if the client message is invalid
/// # Returns
/// An empty response
#[allow(clippy::needless_pass_by_value)]
pub fn verify_client_message(
    deps: Deps,
    env: &Env,
    verify_client_message_msg: VerifyClientMessageMsg,
) -> Result<Binary, ContractError> {
    let client_message = ClientMessage::decode(&verify_client_message_msg.client_message)
        .map_err(ContractError::DeserializeClientMessageFailed)?;
    let client_state = get_client_state(deps.storage)?;

    verify::verify_client_message(
        &HostStore(deps.storage),
        &client_state,
        &client_message,
        &host_context(env),
    )
    .map_err(ContractError::VerifyClientMessageFailed)?;

    Ok(Binary::default())
}

/// Checks a verified client message for misbehaviour
/// # Errors
/// Returns an error if the client message or the client state cannot be decoded
#[allow(clippy::needless_pass_by_value)]
pub fn check_for_misbehaviour(
    deps: Deps,
    check_for_misbehaviour_msg: CheckForMisbehaviourMsg,
) -> Result<Binary, ContractError> {
    let client_message = ClientMessage::decode(&check_for_misbehaviour_msg.client_message)
        .map_err(ContractError::DeserializeClientMessageFailed)?;
    let client_state = get_client_state(deps.storage)?;

    let found_misbehaviour =
        verify::check_for_misbehaviour(&HostStore(deps.storage), &client_state, &client_message);

    Ok(to_json_binary(&CheckForMisbehaviourResult {
        found_misbehaviour,
    })?)
}

/// Gets the consensus timestamp at a given height
/// # Errors
/// Returns an error if the conensus state is not found
/// # Returns
/// The timestamp at the given height, in nanoseconds
#[allow(clippy::needless_pass_by_value)]
pub fn timestamp_at_height(
    deps: Deps,
    timestamp_at_height_msg: TimestampAtHeightMsg,
) -> Result<Binary, ContractError> {
    let timestamp = status::timestamp_at_height(
        &HostStore(deps.storage),
        timestamp_at_height_msg.height.into(),
    )
    .map_err(ContractError::TimestampAtHeightFailed)?;

    Ok(to_json_binary(&TimestampAtHeightResult { timestamp })?)
}

/// Gets the status of the light client
/// # Returns
/// The current status of the client
/// # Errors
/// Errors if the client state or the latest consensus state can't be deserialized.
pub fn status(deps: Deps, env: &Env) -> Result<Binary, ContractError> {
    let client_state = get_client_state(deps.storage)?;
    let status = status::status(&HostStore(deps.storage), &client_state, &host_context(env))
        .map_err(ContractError::StatusFailed)?;

    Ok(to_json_binary(&StatusResult {
        status: status.to_string(),
    })?)
}
