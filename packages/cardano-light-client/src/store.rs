//! The client store: key layout and typed accessors over a host supplied key-value namespace

use ibc_proto::{
    google::protobuf::Any,
    ibc::{
        core::client::v1::Height as ProtoHeight,
        lightclients::wasm::v1::{
            ClientState as WasmClientState, ConsensusState as WasmConsensusState,
        },
    },
};
use prost::Message;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    client_state::ClientState,
    consensus_state::ConsensusState,
    error::CardanoClientError,
    height::Height,
    pool::{SpoState, Validator},
};

/// The store key used by `ibc-go` to store the client state
pub const CLIENT_STATE_KEY: &str = "clientState";
/// The store key prefix used by `ibc-go` to store the consensus states
pub const CONSENSUS_STATES_KEY: &str = "consensusStates";
/// Prefix of the height ordered iteration index
pub const ITERATE_CONSENSUS_STATES_KEY: &str = "iterateConsensusStates";
/// Suffix of the host time a consensus state was installed at
pub const PROCESSED_TIME_KEY: &str = "processedTime";
/// Suffix of the host height a consensus state was installed at
pub const PROCESSED_HEIGHT_KEY: &str = "processedHeight";
/// Prefix of the per epoch stake pool sets
pub const CLIENT_SPOS_KEY: &str = "client_spos";
/// Prefix of the per epoch stake pool event journals
pub const SPO_STATE_KEY: &str = "spo_state";
/// Prefix of the indexed UTXO datums
pub const UTXOS_KEY: &str = "utxos";
/// Prefix of the block hash of every installed consensus state
pub const CONSENSUS_STATES_BLOCK_HASH_KEY: &str = "consensusStatesBlockHash";
/// Prefix of the Mithril authenticated IBC state roots
pub const IBC_STATE_ROOT_KEY: &str = "ibcStateRoot";
/// Prefix of the accepted Mithril certificate hash per epoch
pub const MITHRIL_CERTIFICATE_KEY: &str = "mithrilCertificate";

/// Read access to the client store
pub trait ClientStoreRead {
    /// The value stored under `key`
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// The entry with the greatest key in `[start, end)`
    fn last_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)>;

    /// The entry with the least key in `[start, end)`
    fn first_in_range(&self, start: &[u8], end: &[u8]) -> Option<(Vec<u8>, Vec<u8>)>;
}

/// Write access to the client store
pub trait ClientStore: ClientStoreRead {
    /// Stores `value` under `key`
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Removes `key`
    fn remove(&mut self, key: &[u8]);
}

/// The key used to store the consensus state at `height`
#[must_use]
pub fn consensus_state_key(height: Height) -> String {
    format!("{CONSENSUS_STATES_KEY}/{height}")
}

/// The key used to store the processed time of the consensus state at `height`
#[must_use]
pub fn processed_time_key(height: Height) -> String {
    format!("{CONSENSUS_STATES_KEY}/{height}/{PROCESSED_TIME_KEY}")
}

/// The key used to store the processed height of the consensus state at `height`
#[must_use]
pub fn processed_height_key(height: Height) -> String {
    format!("{CONSENSUS_STATES_KEY}/{height}/{PROCESSED_HEIGHT_KEY}")
}

/// The iteration index key of `height`, which sorts like the height itself
#[must_use]
pub fn iteration_key(height: Height) -> Vec<u8> {
    let mut key = ITERATE_CONSENSUS_STATES_KEY.as_bytes().to_vec();
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// The stake pool set of `epoch`
#[must_use]
pub fn client_spos_key(epoch: u64) -> String {
    format!("{CLIENT_SPOS_KEY}/{epoch}")
}

/// The stake pool event journal effective at `epoch`
#[must_use]
pub fn spo_state_key(epoch: u64) -> String {
    format!("{SPO_STATE_KEY}/{epoch}")
}

/// The block hash of the consensus state at `height`
#[must_use]
pub fn block_hash_key(height: Height) -> String {
    format!("{CONSENSUS_STATES_BLOCK_HASH_KEY}/{height}")
}

/// The Mithril authenticated IBC state root at `height`
#[must_use]
pub fn ibc_state_root_key(height: Height) -> String {
    format!("{IBC_STATE_ROOT_KEY}/{height}")
}

/// The Mithril certificate accepted for `epoch`
#[must_use]
pub fn mithril_certificate_key(epoch: u64) -> String {
    format!("{MITHRIL_CERTIFICATE_KEY}/{epoch}")
}

/// The store key of an indexed UTXO datum, given its proof path
#[must_use]
pub fn utxo_key(path: &str) -> String {
    format!("{UTXOS_KEY}/{path}")
}

/// Exclusive upper bound of every key starting with `prefix`
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return end;
        }
    }
    vec![u8::MAX; prefix.len() + 1]
}

/// Get the Wasm client state
/// # Errors
/// Returns an error if the client state is not found or cannot be decoded
pub fn get_wasm_client_state<S: ClientStoreRead + ?Sized>(
    store: &S,
) -> Result<WasmClientState, CardanoClientError> {
    let any_bz = store
        .get(CLIENT_STATE_KEY.as_bytes())
        .ok_or(CardanoClientError::ClientStateNotFound)?;
    let any = Any::decode(any_bz.as_slice())?;
    Ok(WasmClientState::decode(any.value.as_slice())?)
}

/// Get the Cardano client state
/// # Errors
/// Returns an error if the client state is not found or cannot be decoded
pub fn get_client_state<S: ClientStoreRead + ?Sized>(
    store: &S,
) -> Result<ClientState, CardanoClientError> {
    let wasm_client_state = get_wasm_client_state(store)?;
    Ok(serde_json::from_slice(&wasm_client_state.data)?)
}

/// Store the client state, keeping the checksum of the stored Wasm client state
/// # Errors
/// Returns an error if the client state cannot be encoded
pub fn set_client_state<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
) -> Result<(), CardanoClientError> {
    let checksum = match get_wasm_client_state(store) {
        Ok(existing) => existing.checksum,
        Err(CardanoClientError::ClientStateNotFound) => Vec::new(),
        Err(e) => return Err(e),
    };
    set_wasm_client_state(store, client_state, checksum)
}

/// Store the client state wrapped in a Wasm client state carrying `checksum`
/// # Errors
/// Returns an error if the client state cannot be encoded
pub fn set_wasm_client_state<S: ClientStore + ?Sized>(
    store: &mut S,
    client_state: &ClientState,
    checksum: Vec<u8>,
) -> Result<(), CardanoClientError> {
    let wasm_client_state = WasmClientState {
        data: serde_json::to_vec(client_state)?,
        checksum,
        latest_height: Some(ProtoHeight {
            revision_number: client_state.latest_height.revision_number,
            revision_height: client_state.latest_height.revision_height,
        }),
    };
    let any = Any::from_msg(&wasm_client_state)?;
    store.set(CLIENT_STATE_KEY.as_bytes(), &any.encode_to_vec());
    Ok(())
}

/// Get the consensus state at `height`, if any
/// # Errors
/// Returns an error if a stored consensus state cannot be decoded
pub fn get_consensus_state<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<Option<ConsensusState>, CardanoClientError> {
    store
        .get(consensus_state_key(height).as_bytes())
        .map(|bz| decode_consensus_state(&bz))
        .transpose()
}

/// Get the consensus state at `height`
/// # Errors
/// Returns [`CardanoClientError::ConsensusStateNotFound`] if there is none
pub fn must_get_consensus_state<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<ConsensusState, CardanoClientError> {
    get_consensus_state(store, height)?.ok_or(CardanoClientError::ConsensusStateNotFound(height))
}

fn decode_consensus_state(bz: &[u8]) -> Result<ConsensusState, CardanoClientError> {
    let any = Any::decode(bz)?;
    let wasm_consensus_state = WasmConsensusState::decode(any.value.as_slice())?;
    Ok(serde_json::from_slice(&wasm_consensus_state.data)?)
}

/// Store the consensus state at `height` along with its iteration key
/// # Errors
/// Returns an error if the consensus state cannot be encoded
pub fn set_consensus_state<S: ClientStore + ?Sized>(
    store: &mut S,
    height: Height,
    consensus_state: &ConsensusState,
) -> Result<(), CardanoClientError> {
    let key = consensus_state_key(height);
    let wasm_consensus_state = WasmConsensusState {
        data: serde_json::to_vec(consensus_state)?,
    };
    let any = Any::from_msg(&wasm_consensus_state)?;
    store.set(key.as_bytes(), &any.encode_to_vec());
    store.set(&iteration_key(height), key.as_bytes());
    Ok(())
}

/// Delete the consensus state at `height`, its metadata and its block hash
pub fn delete_consensus_state<S: ClientStore + ?Sized>(store: &mut S, height: Height) {
    store.remove(consensus_state_key(height).as_bytes());
    store.remove(processed_time_key(height).as_bytes());
    store.remove(processed_height_key(height).as_bytes());
    store.remove(&iteration_key(height));
    store.remove(block_hash_key(height).as_bytes());
}

/// Record when the consensus state at `height` was installed
pub fn set_consensus_metadata<S: ClientStore + ?Sized>(
    store: &mut S,
    height: Height,
    host_time_ns: u64,
    host_height: Height,
) {
    store.set(
        processed_time_key(height).as_bytes(),
        &host_time_ns.to_be_bytes(),
    );
    store.set(
        processed_height_key(height).as_bytes(),
        host_height.to_string().as_bytes(),
    );
}

/// Host time in nanoseconds the consensus state at `height` was installed at
/// # Errors
/// Returns [`CardanoClientError::ProcessedTimeNotFound`] if missing or malformed
pub fn get_processed_time<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<u64, CardanoClientError> {
    store
        .get(processed_time_key(height).as_bytes())
        .and_then(|bz| <[u8; 8]>::try_from(bz.as_slice()).ok())
        .map(u64::from_be_bytes)
        .ok_or(CardanoClientError::ProcessedTimeNotFound(height))
}

/// Host height the consensus state at `height` was installed at
/// # Errors
/// Returns [`CardanoClientError::ProcessedHeightNotFound`] if missing or malformed
pub fn get_processed_height<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<Height, CardanoClientError> {
    store
        .get(processed_height_key(height).as_bytes())
        .and_then(|bz| String::from_utf8(bz).ok())
        .and_then(|s| s.parse().ok())
        .ok_or(CardanoClientError::ProcessedHeightNotFound(height))
}

fn consensus_entry<S: ClientStoreRead + ?Sized>(
    store: &S,
    entry: Option<(Vec<u8>, Vec<u8>)>,
) -> Result<Option<(Height, ConsensusState)>, CardanoClientError> {
    let Some((iteration_key, consensus_key)) = entry else {
        return Ok(None);
    };
    let height_bytes = iteration_key
        .get(ITERATE_CONSENSUS_STATES_KEY.len()..)
        .and_then(|b| <[u8; 16]>::try_from(b).ok())
        .unwrap_or_else(|| panic!("malformed iteration key {}", hex::encode(&iteration_key)));
    let bz = store.get(&consensus_key).unwrap_or_else(|| {
        panic!(
            "iteration key {} points to missing consensus state {}",
            hex::encode(&iteration_key),
            String::from_utf8_lossy(&consensus_key)
        )
    });
    Ok(Some((
        Height::from_be_bytes(height_bytes),
        decode_consensus_state(&bz)?,
    )))
}

/// The consensus state with the greatest height strictly below `height`
/// # Errors
/// Returns an error if the consensus state cannot be decoded
/// # Panics
/// Panics if the iteration index points at a missing consensus state
pub fn previous_consensus_state<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<Option<(Height, ConsensusState)>, CardanoClientError> {
    let entry = store.last_in_range(ITERATE_CONSENSUS_STATES_KEY.as_bytes(), &iteration_key(height));
    consensus_entry(store, entry)
}

/// The consensus state with the least height strictly above `height`
/// # Errors
/// Returns an error if the consensus state cannot be decoded
/// # Panics
/// Panics if the iteration index points at a missing consensus state
pub fn next_consensus_state<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<Option<(Height, ConsensusState)>, CardanoClientError> {
    let mut start = iteration_key(height);
    start.push(0);
    let end = prefix_end(ITERATE_CONSENSUS_STATES_KEY.as_bytes());
    let entry = store.first_in_range(&start, &end);
    consensus_entry(store, entry)
}

/// The consensus state with the lowest height
/// # Errors
/// Returns an error if the consensus state cannot be decoded
/// # Panics
/// Panics if the iteration index points at a missing consensus state
pub fn earliest_consensus_state<S: ClientStoreRead + ?Sized>(
    store: &S,
) -> Result<Option<(Height, ConsensusState)>, CardanoClientError> {
    let prefix = ITERATE_CONSENSUS_STATES_KEY.as_bytes();
    let entry = store.first_in_range(prefix, &prefix_end(prefix));
    consensus_entry(store, entry)
}

/// Visits consensus states in ascending height order until `f` returns `false`
/// # Errors
/// Returns an error if a consensus state cannot be decoded
/// # Panics
/// Panics if the iteration index points at a missing consensus state
pub fn iterate_consensus_states_ascending<S, F>(store: &S, mut f: F) -> Result<(), CardanoClientError>
where
    S: ClientStoreRead + ?Sized,
    F: FnMut(Height, &ConsensusState) -> bool,
{
    let mut current = earliest_consensus_state(store)?;
    while let Some((height, consensus_state)) = current {
        if !f(height, &consensus_state) {
            break;
        }
        current = next_consensus_state(store, height)?;
    }
    Ok(())
}

fn get_json<S: ClientStoreRead + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
) -> Result<Option<T>, CardanoClientError> {
    store
        .get(key.as_bytes())
        .map(|bz| serde_json::from_slice(&bz))
        .transpose()
        .map_err(Into::into)
}

fn set_json<S: ClientStore + ?Sized, T: Serialize>(
    store: &mut S,
    key: &str,
    value: &T,
) -> Result<(), CardanoClientError> {
    store.set(key.as_bytes(), &serde_json::to_vec(value)?);
    Ok(())
}

/// The stake pool set of `epoch`, empty if none was recorded
/// # Errors
/// Returns an error if the stored set cannot be decoded
pub fn get_client_spos<S: ClientStoreRead + ?Sized>(
    store: &S,
    epoch: u64,
) -> Result<Vec<Validator>, CardanoClientError> {
    Ok(get_json(store, &client_spos_key(epoch))?.unwrap_or_default())
}

/// Whether a stake pool set was recorded for `epoch`
pub fn has_client_spos<S: ClientStoreRead + ?Sized>(store: &S, epoch: u64) -> bool {
    store.get(client_spos_key(epoch).as_bytes()).is_some()
}

/// Store the stake pool set of `epoch`
/// # Errors
/// Returns an error if the set cannot be encoded
pub fn set_client_spos<S: ClientStore + ?Sized>(
    store: &mut S,
    epoch: u64,
    validators: &[Validator],
) -> Result<(), CardanoClientError> {
    set_json(store, &client_spos_key(epoch), &validators)
}

/// The stake pool event journal effective at `epoch`
/// # Errors
/// Returns an error if the stored journal cannot be decoded
pub fn get_spo_state<S: ClientStoreRead + ?Sized>(
    store: &S,
    epoch: u64,
) -> Result<Vec<SpoState>, CardanoClientError> {
    Ok(get_json(store, &spo_state_key(epoch))?.unwrap_or_default())
}

/// Store the stake pool event journal effective at `epoch`
/// # Errors
/// Returns an error if the journal cannot be encoded
pub fn set_spo_state<S: ClientStore + ?Sized>(
    store: &mut S,
    epoch: u64,
    events: &[SpoState],
) -> Result<(), CardanoClientError> {
    set_json(store, &spo_state_key(epoch), &events)
}

/// Hex block hash of the consensus state at `height`
pub fn get_block_hash<S: ClientStoreRead + ?Sized>(store: &S, height: Height) -> Option<String> {
    store
        .get(block_hash_key(height).as_bytes())
        .and_then(|bz| String::from_utf8(bz).ok())
}

/// Record the hex block hash of the consensus state at `height`
pub fn set_block_hash<S: ClientStore + ?Sized>(store: &mut S, height: Height, block_hash: &str) {
    store.set(
        block_hash_key(height).as_bytes(),
        block_hash.to_lowercase().as_bytes(),
    );
}

/// The Mithril authenticated IBC state root at `height`
pub fn get_ibc_state_root<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Option<Vec<u8>> {
    store.get(ibc_state_root_key(height).as_bytes())
}

/// Record the Mithril authenticated IBC state root at `height`
pub fn set_ibc_state_root<S: ClientStore + ?Sized>(store: &mut S, height: Height, root: &[u8]) {
    store.set(ibc_state_root_key(height).as_bytes(), root);
}

/// The Mithril certificate hash accepted for `epoch`
pub fn get_mithril_certificate<S: ClientStoreRead + ?Sized>(
    store: &S,
    epoch: u64,
) -> Option<String> {
    store
        .get(mithril_certificate_key(epoch).as_bytes())
        .and_then(|bz| String::from_utf8(bz).ok())
}

/// Record the Mithril certificate hash accepted for `epoch`
pub fn set_mithril_certificate<S: ClientStore + ?Sized>(
    store: &mut S,
    epoch: u64,
    certificate_hash: &str,
) {
    store.set(
        mithril_certificate_key(epoch).as_bytes(),
        certificate_hash.as_bytes(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixture_client_state, MemoryStore};

    fn cs(timestamp: u64, slot: u64) -> ConsensusState {
        ConsensusState { timestamp, slot }
    }

    #[test]
    fn keys_follow_the_host_layout() {
        let h = Height::new(0, 303_388);
        assert_eq!(consensus_state_key(h), "consensusStates/0-303388");
        assert_eq!(processed_time_key(h), "consensusStates/0-303388/processedTime");
        assert_eq!(processed_height_key(h), "consensusStates/0-303388/processedHeight");
        assert_eq!(client_spos_key(3), "client_spos/3");
        assert_eq!(spo_state_key(5), "spo_state/5");
        assert_eq!(block_hash_key(h), "consensusStatesBlockHash/0-303388");
        assert_eq!(utxo_key("0-1/client/ab/0"), "utxos/0-1/client/ab/0");

        let key = iteration_key(Height::new(1, 2));
        assert!(key.starts_with(b"iterateConsensusStates"));
        assert_eq!(&key[22..], &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn prefix_end_bounds_the_prefix() {
        assert_eq!(prefix_end(b"ab"), b"ac".to_vec());
        assert_eq!(prefix_end(&[0x61, 0xff]), vec![0x62]);
        assert_eq!(prefix_end(&[0xff]), vec![0xff, 0xff]);
    }

    #[test]
    fn client_state_round_trips_and_keeps_checksum() {
        let mut store = MemoryStore::default();
        assert!(matches!(
            get_client_state(&store),
            Err(CardanoClientError::ClientStateNotFound)
        ));

        let mut client_state = fixture_client_state();
        set_wasm_client_state(&mut store, &client_state, vec![7; 32]).unwrap();
        client_state.latest_height = Height::new(0, 303_400);
        set_client_state(&mut store, &client_state).unwrap();

        assert_eq!(get_client_state(&store).unwrap(), client_state);
        let wasm = get_wasm_client_state(&store).unwrap();
        assert_eq!(wasm.checksum, vec![7; 32]);
        assert_eq!(wasm.latest_height.unwrap().revision_height, 303_400);
    }

    #[test]
    fn iteration_walks_heights_in_order() {
        let mut store = MemoryStore::default();
        // "0-10" sorts before "0-9" as a string
        for (h, t) in [(300u64, 3u64), (10, 2), (9, 1)] {
            set_consensus_state(&mut store, Height::new(0, h), &cs(t, t)).unwrap();
        }
        store.set(b"zzz-unrelated", b"x");
        store.set(b"aaa-unrelated", b"x");

        let mut seen = vec![];
        iterate_consensus_states_ascending(&store, |h, _| {
            seen.push(h.revision_height);
            true
        })
        .unwrap();
        assert_eq!(seen, vec![9, 10, 300]);

        let (prev, prev_cs) = previous_consensus_state(&store, Height::new(0, 10))
            .unwrap()
            .unwrap();
        assert_eq!(prev, Height::new(0, 9));
        assert_eq!(prev_cs, cs(1, 1));
        assert!(previous_consensus_state(&store, Height::new(0, 9)).unwrap().is_none());

        let (next, _) = next_consensus_state(&store, Height::new(0, 10)).unwrap().unwrap();
        assert_eq!(next, Height::new(0, 300));
        assert_eq!(
            next_consensus_state(&store, Height::new(0, 5)).unwrap().unwrap().0,
            Height::new(0, 9)
        );
        assert!(next_consensus_state(&store, Height::new(0, 300)).unwrap().is_none());
    }

    #[test]
    fn iteration_stops_when_asked() {
        let mut store = MemoryStore::default();
        for h in 1..=5 {
            set_consensus_state(&mut store, Height::new(0, h), &cs(h, h)).unwrap();
        }
        let mut count = 0;
        iterate_consensus_states_ascending(&store, |_, _| {
            count += 1;
            count < 2
        })
        .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn delete_removes_state_and_metadata() {
        let mut store = MemoryStore::default();
        let h = Height::new(0, 42);
        set_consensus_state(&mut store, h, &cs(1, 1)).unwrap();
        set_consensus_metadata(&mut store, h, 123, Height::new(0, 9));
        set_block_hash(&mut store, h, "ABCD");

        assert_eq!(get_processed_time(&store, h).unwrap(), 123);
        assert_eq!(get_processed_height(&store, h).unwrap(), Height::new(0, 9));
        assert_eq!(get_block_hash(&store, h).as_deref(), Some("abcd"));

        delete_consensus_state(&mut store, h);
        assert!(store.is_empty());
        assert!(matches!(
            must_get_consensus_state(&store, h),
            Err(CardanoClientError::ConsensusStateNotFound(_))
        ));
        assert!(matches!(
            get_processed_time(&store, h),
            Err(CardanoClientError::ProcessedTimeNotFound(_))
        ));
    }

    #[test]
    #[should_panic(expected = "points to missing consensus state")]
    fn dangling_iteration_key_is_a_broken_store() {
        let mut store = MemoryStore::default();
        store.set(&iteration_key(Height::new(0, 1)), b"consensusStates/0-1");
        let _ = earliest_consensus_state(&store);
    }
}
