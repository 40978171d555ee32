//! Test helpers for the Cardano light client contract

use cardano_light_client::{
    consensus_state::ConsensusState,
    test_utils::{fixture_client_state, fixture_ctx},
};
use cosmwasm_std::testing::{message_info, mock_dependencies, mock_env, MockApi, MockQuerier, MockStorage};
use cosmwasm_std::{coins, Empty, Env, OwnedDeps, Timestamp};

use crate::{contract::instantiate, msg::InstantiateMsg};

/// Mock dependencies for testing
#[must_use]
pub fn mk_deps() -> OwnedDeps<MockStorage, MockApi, MockQuerier, Empty> {
    mock_dependencies()
}

/// An env at the host time and height of the fixture client
#[must_use]
pub fn fixture_env() -> Env {
    let ctx = fixture_ctx();
    let mut env = mock_env();
    env.block.time = Timestamp::from_nanos(ctx.block_time_ns);
    env.block.height = ctx.block_height.revision_height;
    env
}

/// Instantiates the fixture client, one block before the preprod fixture block
#[must_use]
pub fn instantiate_msg() -> InstantiateMsg {
    let consensus_state = ConsensusState {
        timestamp: 1_707_122_673,
        slot: 1_214_009,
    };
    InstantiateMsg {
        client_state: serde_json::to_vec(&fixture_client_state()).unwrap().into(),
        consensus_state: serde_json::to_vec(&consensus_state).unwrap().into(),
        checksum: b"cardano_checksum".into(),
    }
}

/// Mock dependencies holding the instantiated fixture client
#[must_use]
pub fn instantiated_deps() -> OwnedDeps<MockStorage, MockApi, MockQuerier, Empty> {
    let mut deps = mk_deps();
    let creator = deps.api.addr_make("creator");
    let info = message_info(&creator, &coins(1, "uatom"));
    instantiate(deps.as_mut(), fixture_env(), info, instantiate_msg()).unwrap();
    deps
}
