//! State management for the Cardano light client: the host storage seen as a client store

use cardano_light_client::{
    client_state::ClientState,
    context::HostContext,
    store::{ClientStore, ClientStoreRead, CLIENT_STATE_KEY},
    Height,
};
use cosmwasm_std::{Env, Order, Record, Storage};
use ibc_proto::{google::protobuf::Any, ibc::lightclients::wasm::v1::ClientState as WasmClientState};
use prost::Message;

use crate::ContractError;

/// The first record of `[start, end)` in `order`
fn first_record(storage: &dyn Storage, start: &[u8], end: &[u8], order: Order) -> Option<Record> {
    if start >= end {
        return None;
    }
    storage.range(Some(start), Some(end), order).next()
}

/// Read access to the contract storage
pub struct HostStore<'a>(pub &'a dyn Storage);

impl ClientStoreRead for HostStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key)
    }

    fn last_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        first_record(self.0, start, end, Order::Descending)
    }

    fn first_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        first_record(self.0, start, end, Order::Ascending)
    }
}

/// Write access to the contract storage
pub struct HostStoreMut<'a>(pub &'a mut dyn Storage);

impl ClientStoreRead for HostStoreMut<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key)
    }

    fn last_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        first_record(&*self.0, start, end, Order::Descending)
    }

    fn first_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
        first_record(&*self.0, start, end, Order::Ascending)
    }
}

impl ClientStore for HostStoreMut<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        // the host rejects empty values, and the client reads an empty value as absent
        if value.is_empty() {
            self.0.remove(key);
        } else {
            self.0.set(key, value);
        }
    }

    fn remove(&mut self, key: &[u8]) {
        self.0.remove(key);
    }
}

/// Time and height of the executing host block
#[must_use]
pub fn host_context(env: &Env) -> HostContext {
    HostContext {
        block_time_ns: env.block.time.nanos(),
        block_height: Height::new(0, env.block.height),
    }
}

/// Get the Wasm client state
/// # Errors
/// Returns an error if the client state is not found or cannot be deserialized
pub fn get_wasm_client_state(storage: &dyn Storage) -> Result<WasmClientState, ContractError> {
    let wasm_client_state_any_bz = storage
        .get(CLIENT_STATE_KEY.as_bytes())
        .ok_or(ContractError::ClientStateNotFound)?;
    let wasm_client_state_any = Any::decode(wasm_client_state_any_bz.as_slice())?;

    Ok(WasmClientState::decode(
        wasm_client_state_any.value.as_slice(),
    )?)
}

/// Get the Cardano client state
/// # Errors
/// Returns an error if the client state is not found or cannot be deserialized
pub fn get_client_state(storage: &dyn Storage) -> Result<ClientState, ContractError> {
    let wasm_client_state = get_wasm_client_state(storage)?;
    Ok(serde_json::from_slice(&wasm_client_state.data)?)
}
