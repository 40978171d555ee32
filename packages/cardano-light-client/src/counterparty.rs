//! Field comparison of indexed datums against the values the counterparty's IBC handler
//! expects, given in their protobuf encoding.

use ibc_proto::{
    google::protobuf::{Any, Duration},
    ibc::{
        core::{channel::v1::Channel, connection::v1::ConnectionEnd, client::v1::Height as ProtoHeight},
        lightclients::tendermint::v1::{
            ClientState as TmClientState, ConsensusState as TmConsensusState,
        },
    },
};
use prost::Message;

use crate::{
    cbor::CONSTR_TAG_BASE,
    datum::{ChannelDatum, ClientStateDatum, ConnectionEndDatum, ConsensusStateDatum, HeightDatum},
    error::CardanoClientError,
};

fn mismatch(what: &str, expected: impl std::fmt::Debug, got: impl std::fmt::Debug) -> CardanoClientError {
    CardanoClientError::FailedMembershipVerification(format!(
        "{what} mismatch, expected {expected:?}, got {got:?}"
    ))
}

fn not_decodable(what: &str, e: &prost::DecodeError) -> CardanoClientError {
    CardanoClientError::FailedMembershipVerification(format!("expected value is not {what}: {e}"))
}

fn unix_nanos(seconds: i64, nanos: i32) -> u64 {
    u64::try_from(seconds)
        .unwrap_or_default()
        .saturating_mul(1_000_000_000)
        .saturating_add(u64::try_from(nanos).unwrap_or_default())
}

fn duration_nanos(duration: Option<&Duration>) -> u64 {
    duration.map_or(0, |d| unix_nanos(d.seconds, d.nanos))
}

fn height_eq(datum: HeightDatum, expected: Option<&ProtoHeight>) -> bool {
    let expected = expected.cloned().unwrap_or_default();
    datum.revision_number == expected.revision_number
        && datum.revision_height == expected.revision_height
}

/// Converts an enum constructor tag back to the IBC enum value
fn tag_value(tag: u64) -> i64 {
    i64::try_from(tag).unwrap_or(i64::MAX) - i64::try_from(CONSTR_TAG_BASE).unwrap_or(0)
}

/// Compares the strings of both sides as sorted sets
fn same_set(datum: &[Vec<u8>], expected: &[String]) -> bool {
    let mut got: Vec<String> = datum
        .iter()
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect();
    let mut expected = expected.to_vec();
    got.sort();
    expected.sort();
    got == expected
}

/// Compares a client state datum with an `Any` encoded Tendermint client state
///
/// # Errors
/// Returns [`CardanoClientError::FailedMembershipVerification`] naming the first differing
/// field.
pub fn compare_client_state(datum: &ClientStateDatum, expected: &[u8]) -> Result<(), CardanoClientError> {
    let expected: TmClientState = Any::decode(expected)
        .and_then(|any| any.to_msg())
        .map_err(|e| not_decodable("a tendermint client state", &e))?;

    let chain_id = String::from_utf8_lossy(&datum.chain_id);
    ensure!(chain_id == expected.chain_id, mismatch("chain id", &expected.chain_id, chain_id));
    let trust_level = expected.trust_level.unwrap_or_default();
    ensure!(
        datum.trust_level.numerator == trust_level.numerator
            && datum.trust_level.denominator == trust_level.denominator,
        mismatch("trust level", trust_level, datum.trust_level)
    );
    for (what, got, want) in [
        ("trusting period", datum.trusting_period, expected.trusting_period.as_ref()),
        ("unbonding period", datum.unbonding_period, expected.unbonding_period.as_ref()),
        ("max clock drift", datum.max_clock_drift, expected.max_clock_drift.as_ref()),
    ] {
        ensure!(got == duration_nanos(want), mismatch(what, duration_nanos(want), got));
    }
    ensure!(
        height_eq(datum.frozen_height, expected.frozen_height.as_ref()),
        mismatch("frozen height", expected.frozen_height, datum.frozen_height)
    );
    ensure!(
        height_eq(datum.latest_height, expected.latest_height.as_ref()),
        mismatch("latest height", expected.latest_height, datum.latest_height)
    );
    Ok(())
}

/// Compares a consensus state datum with an `Any` encoded Tendermint consensus state
///
/// # Errors
/// Returns [`CardanoClientError::FailedMembershipVerification`] naming the first differing
/// field.
pub fn compare_consensus_state(
    datum: &ConsensusStateDatum,
    expected: &[u8],
) -> Result<(), CardanoClientError> {
    let expected: TmConsensusState = Any::decode(expected)
        .and_then(|any| any.to_msg())
        .map_err(|e| not_decodable("a tendermint consensus state", &e))?;

    let timestamp = expected
        .timestamp
        .map_or(0, |t| unix_nanos(t.seconds, t.nanos));
    ensure!(datum.timestamp == timestamp, mismatch("timestamp", timestamp, datum.timestamp));
    ensure!(
        datum.next_validators_hash == expected.next_validators_hash,
        mismatch(
            "next validators hash",
            hex::encode(&expected.next_validators_hash),
            hex::encode(&datum.next_validators_hash)
        )
    );
    let root = expected.root.unwrap_or_default().hash;
    ensure!(
        datum.root_hash == root,
        mismatch("root hash", hex::encode(&root), hex::encode(&datum.root_hash))
    );
    Ok(())
}

/// Compares a connection end datum with a protobuf connection end
///
/// # Errors
/// Returns [`CardanoClientError::FailedMembershipVerification`] naming the first differing
/// field.
pub fn compare_connection(datum: &ConnectionEndDatum, expected: &[u8]) -> Result<(), CardanoClientError> {
    let expected =
        ConnectionEnd::decode(expected).map_err(|e| not_decodable("a connection end", &e))?;

    let client_id = String::from_utf8_lossy(&datum.client_id);
    ensure!(client_id == expected.client_id, mismatch("client id", &expected.client_id, client_id));
    ensure!(
        datum.versions.len() == expected.versions.len(),
        mismatch("version count", expected.versions.len(), datum.versions.len())
    );
    for (version, want) in datum.versions.iter().zip(&expected.versions) {
        let identifier = String::from_utf8_lossy(&version.identifier);
        ensure!(
            identifier == want.identifier,
            mismatch("version identifier", &want.identifier, identifier)
        );
        ensure!(
            same_set(&version.features, &want.features),
            mismatch("version features", &want.features, &version.features)
        );
    }
    let state = tag_value(datum.state);
    ensure!(
        state == i64::from(expected.state),
        mismatch("connection state", expected.state, state)
    );

    let counterparty = expected.counterparty.unwrap_or_default();
    let client_id = String::from_utf8_lossy(&datum.counterparty.client_id);
    ensure!(
        client_id == counterparty.client_id,
        mismatch("counterparty client id", &counterparty.client_id, client_id)
    );
    let connection_id = String::from_utf8_lossy(&datum.counterparty.connection_id);
    ensure!(
        connection_id == counterparty.connection_id,
        mismatch("counterparty connection id", &counterparty.connection_id, connection_id)
    );
    let key_prefix = counterparty.prefix.unwrap_or_default().key_prefix;
    ensure!(
        datum.counterparty.key_prefix == key_prefix,
        mismatch("counterparty prefix", key_prefix, &datum.counterparty.key_prefix)
    );
    ensure!(
        datum.delay_period == expected.delay_period,
        mismatch("delay period", expected.delay_period, datum.delay_period)
    );
    Ok(())
}

/// Compares a channel datum with a protobuf channel end
///
/// # Errors
/// Returns [`CardanoClientError::FailedMembershipVerification`] naming the first differing
/// field.
pub fn compare_channel(datum: &ChannelDatum, expected: &[u8]) -> Result<(), CardanoClientError> {
    let expected = Channel::decode(expected).map_err(|e| not_decodable("a channel", &e))?;

    let state = tag_value(datum.state);
    ensure!(state == i64::from(expected.state), mismatch("channel state", expected.state, state));
    let ordering = tag_value(datum.ordering);
    ensure!(
        ordering == i64::from(expected.ordering),
        mismatch("channel ordering", expected.ordering, ordering)
    );

    let counterparty = expected.counterparty.unwrap_or_default();
    let port_id = String::from_utf8_lossy(&datum.counterparty.port_id);
    ensure!(
        port_id == counterparty.port_id,
        mismatch("counterparty port id", &counterparty.port_id, port_id)
    );
    let channel_id = String::from_utf8_lossy(&datum.counterparty.channel_id);
    ensure!(
        channel_id == counterparty.channel_id,
        mismatch("counterparty channel id", &counterparty.channel_id, channel_id)
    );
    ensure!(
        same_set(&datum.connection_hops, &expected.connection_hops),
        mismatch("connection hops", &expected.connection_hops, &datum.connection_hops)
    );
    let version = String::from_utf8_lossy(&datum.version);
    ensure!(version == expected.version, mismatch("version", &expected.version, version));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        channel_datum_with_port, client_datum, connection_datum, tm_channel, tm_client_state,
        tm_connection_end, tm_consensus_state,
    };

    fn failed(result: Result<(), CardanoClientError>) -> bool {
        matches!(result, Err(CardanoClientError::FailedMembershipVerification(_)))
    }

    #[test]
    fn client_state_fields_are_compared() {
        let datum = client_datum().client_state;
        let expected = tm_client_state(&datum);
        compare_client_state(&datum, &Any::from_msg(&expected).unwrap().encode_to_vec()).unwrap();

        let mut other = expected.clone();
        other.max_clock_drift = Some(Duration { seconds: 1, nanos: 0 });
        assert!(failed(compare_client_state(
            &datum,
            &Any::from_msg(&other).unwrap().encode_to_vec()
        )));

        let mut other = expected;
        other.trust_level = None;
        assert!(failed(compare_client_state(
            &datum,
            &Any::from_msg(&other).unwrap().encode_to_vec()
        )));
    }

    #[test]
    fn undecodable_expected_value_fails() {
        let datum = client_datum().client_state;
        assert!(failed(compare_client_state(&datum, b"not protobuf")));

        // a consensus state where a client state is expected
        let (_, consensus) = &client_datum().consensus_states[0];
        let wrong_type = Any::from_msg(&tm_consensus_state(consensus)).unwrap().encode_to_vec();
        assert!(failed(compare_client_state(&datum, &wrong_type)));
    }

    #[test]
    fn consensus_state_fields_are_compared() {
        let (_, datum) = client_datum().consensus_states[0].clone();
        let expected = tm_consensus_state(&datum);
        compare_consensus_state(&datum, &Any::from_msg(&expected).unwrap().encode_to_vec())
            .unwrap();

        let mut other = expected;
        other.next_validators_hash.push(0);
        assert!(failed(compare_consensus_state(
            &datum,
            &Any::from_msg(&other).unwrap().encode_to_vec()
        )));
    }

    #[test]
    fn connection_features_compare_as_sets() {
        let datum = connection_datum().state;
        let mut expected = tm_connection_end(&datum);
        expected.versions[0].features.reverse();
        compare_connection(&datum, &expected.encode_to_vec()).unwrap();

        let mut other = expected.clone();
        other.state += 1;
        assert!(failed(compare_connection(&datum, &other.encode_to_vec())));

        let mut other = expected;
        other.delay_period += 1;
        assert!(failed(compare_connection(&datum, &other.encode_to_vec())));
    }

    #[test]
    fn channel_fields_are_compared() {
        let datum = channel_datum_with_port().state.channel;
        let expected = tm_channel(&datum);
        compare_channel(&datum, &expected.encode_to_vec()).unwrap();

        let mut other = expected.clone();
        other.ordering = 1 + other.ordering % 2;
        assert!(failed(compare_channel(&datum, &other.encode_to_vec())));

        let mut other = expected;
        other.version = "ics20-2".to_string();
        assert!(failed(compare_channel(&datum, &other.encode_to_vec())));
    }
}
