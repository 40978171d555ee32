//! Client status and consensus state timestamps

use std::fmt;

use crate::{
    client_state::ClientState,
    context::HostContext,
    error::CardanoClientError,
    height::Height,
    store::{self, ClientStoreRead},
};

/// Status of the client as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The client accepts updates and proofs
    Active,
    /// The client was frozen on misbehaviour
    Frozen,
    /// The latest consensus state is outside the trusting period
    Expired,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Active => "Active",
            Self::Frozen => "Frozen",
            Self::Expired => "Expired",
        };
        f.write_str(status)
    }
}

/// Status of the client at host time `ctx`
///
/// # Errors
/// Returns an error if the latest consensus state cannot be decoded.
pub fn status<S: ClientStoreRead + ?Sized>(
    store: &S,
    client_state: &ClientState,
    ctx: &HostContext,
) -> Result<Status, CardanoClientError> {
    if client_state.is_frozen() {
        return Ok(Status::Frozen);
    }
    let Some(latest) = store::get_consensus_state(store, client_state.latest_height)? else {
        return Ok(Status::Expired);
    };
    let expires_at = latest.timestamp.saturating_add(client_state.trusting_period);
    if expires_at <= ctx.block_time_secs() {
        return Ok(Status::Expired);
    }
    Ok(Status::Active)
}

/// Unix nanoseconds of the consensus state at `height`
///
/// # Errors
/// Returns [`CardanoClientError::ConsensusStateNotFound`] if there is none.
pub fn timestamp_at_height<S: ClientStoreRead + ?Sized>(
    store: &S,
    height: Height,
) -> Result<u64, CardanoClientError> {
    store::must_get_consensus_state(store, height)?.timestamp_nanos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client_message::ClientMessage,
        misbehaviour::Misbehaviour,
        update::update_state_on_misbehaviour,
        verify::check_for_misbehaviour,
        test_utils::{fixture_block_data, fixture_store},
    };

    fn at(secs: u64) -> HostContext {
        HostContext {
            block_time_ns: secs * 1_000_000_000,
            ..HostContext::default()
        }
    }

    #[test]
    fn active_until_the_trusting_period_ends() {
        let (store, client_state) = fixture_store();
        let latest = store::must_get_consensus_state(&store, client_state.latest_height)
            .unwrap()
            .timestamp;
        let expiry = latest + client_state.trusting_period;

        assert_eq!(status(&store, &client_state, &at(latest)).unwrap(), Status::Active);
        assert_eq!(status(&store, &client_state, &at(expiry - 1)).unwrap(), Status::Active);
        assert_eq!(status(&store, &client_state, &at(expiry)).unwrap(), Status::Expired);
    }

    #[test]
    fn missing_latest_consensus_state_is_expired() {
        let (store, mut client_state) = fixture_store();
        client_state.latest_height = client_state.latest_height.increment();
        assert_eq!(status(&store, &client_state, &at(0)).unwrap(), Status::Expired);
    }

    #[test]
    fn fork_at_same_height_freezes_the_client() {
        let (mut store, client_state) = fixture_store();
        let bd = fixture_block_data();
        let mut fork = bd.clone();
        fork.hash = "00".repeat(32);
        let msg = ClientMessage::from(Misbehaviour {
            client_id: "08-cardano-0".to_string(),
            block_data_1: bd,
            block_data_2: fork,
        });

        assert!(check_for_misbehaviour(&store, &client_state, &msg));
        update_state_on_misbehaviour(&mut store, &client_state).unwrap();
        let frozen = store::get_client_state(&store).unwrap();
        assert_eq!(status(&store, &frozen, &at(0)).unwrap(), Status::Frozen);
        assert_eq!(Status::Frozen.to_string(), "Frozen");
    }

    #[test]
    fn timestamps_are_reported_in_nanoseconds() {
        let (store, client_state) = fixture_store();
        let latest = store::must_get_consensus_state(&store, client_state.latest_height).unwrap();
        assert_eq!(
            timestamp_at_height(&store, client_state.latest_height).unwrap(),
            latest.timestamp * 1_000_000_000
        );
        assert!(matches!(
            timestamp_at_height(&store, Height::new(0, 1)),
            Err(CardanoClientError::ConsensusStateNotFound(_))
        ));
    }
}
