//! This module contains the `CosmWasm` entrypoints for the 08-wasm smart contract

use cosmwasm_std::{entry_point, Binary, Deps, DepsMut, Env, MessageInfo, Response};

use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg, SudoMsg};
use crate::{instantiate, query};
use crate::{sudo, ContractError};

/// The version of the contracts state.
/// It is used to determine if the state needs to be migrated in the migrate entry point.
const STATE_VERSION: &str = env!("CARGO_PKG_VERSION");
const CONTRACT_NAME: &str = env!("CARGO_PKG_NAME");

/// The instantiate entry point for the CosmWasm contract.
/// # Errors
/// Will return an error if the client state or consensus state cannot be deserialized, or is
/// rejected by the client.
#[entry_point]
#[allow(clippy::needless_pass_by_value)]
pub fn instantiate(
    deps: DepsMut,
    env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    cw2::set_contract_version(deps.storage, CONTRACT_NAME, STATE_VERSION)?;

    instantiate::client(deps.storage, &env, msg)?;

    Ok(Response::default())
}

/// The sudo entry point for the CosmWasm contract.
/// It routes the message to the appropriate handler.
/// # Errors
/// Will return an error if the handler returns an error.
#[entry_point]
#[allow(clippy::needless_pass_by_value)]
pub fn sudo(deps: DepsMut, env: Env, msg: SudoMsg) -> Result<Response, ContractError> {
    let result = match msg {
        SudoMsg::UpdateState(update_state_msg) => {
            return sudo::update_state(deps, &env, update_state_msg)
        }
        SudoMsg::UpdateStateOnMisbehaviour(misbehaviour_msg) => {
            sudo::misbehaviour(deps, misbehaviour_msg)?
        }
        SudoMsg::VerifyMembership(verify_membership_msg) => {
            sudo::verify_membership(deps.as_ref(), &env, verify_membership_msg)?
        }
        SudoMsg::VerifyNonMembership(verify_non_membership_msg) => {
            sudo::verify_non_membership(deps.as_ref(), &env, verify_non_membership_msg)?
        }
        SudoMsg::VerifyUpgradeAndUpdateState(_) => {
            return Err(ContractError::NotImplemented("verify upgrade and update state"))
        }
        SudoMsg::MigrateClientStore(_) => {
            return Err(ContractError::NotImplemented("migrate client store"))
        }
    };

    Ok(Response::default().set_data(result))
}

/// Execute entry point is not used in this contract.
/// # Errors
/// Always, there are no execute messages.
#[entry_point]
#[allow(clippy::needless_pass_by_value)]
pub fn execute(
    _deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    _msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    Err(ContractError::NotImplemented("execute"))
}

/// The query entry point for the CosmWasm contract.
/// It routes the message to the appropriate handler.
/// # Errors
/// Will return an error if the handler returns an error.
#[entry_point]
#[allow(clippy::needless_pass_by_value)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> Result<Binary, ContractError> {
    match msg {
        QueryMsg::VerifyClientMessage(verify_client_message_msg) => {
            query::verify_client_message(deps, &env, verify_client_message_msg)
        }
        QueryMsg::CheckForMisbehaviour(check_for_misbehaviour_msg) => {
            query::check_for_misbehaviour(deps, check_for_misbehaviour_msg)
        }
        QueryMsg::TimestampAtHeight(timestamp_at_height_msg) => {
            query::timestamp_at_height(deps, timestamp_at_height_msg)
        }
        QueryMsg::Status(_) => query::status(deps, &env),
    }
}

/// The migrate entry point for the CosmWasm contract.
/// The client store layout has a single version, so migrating only records the new contract
/// version.
/// # Errors
/// Will return an error if the contract version cannot be stored.
#[entry_point]
#[allow(clippy::needless_pass_by_value)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    cw2::set_contract_version(deps.storage, CONTRACT_NAME, STATE_VERSION)?;
    Ok(Response::default())
}

#[cfg(test)]
mod tests {
    mod instantiate {
        use cardano_light_client::{
            consensus_state::ConsensusState,
            store::{self, ClientStoreRead},
            test_utils::{fixture_client_state, FIXTURE_VRF_KEY_HASH},
            Height,
        };
        use cosmwasm_std::{
            coins,
            testing::{message_info, mock_env},
            Storage,
        };
        use ibc_proto::{
            google::protobuf::Any, ibc::lightclients::wasm::v1::ClientState as WasmClientState,
        };
        use prost::{Message, Name};

        use crate::{
            contract::instantiate,
            msg::InstantiateMsg,
            state::HostStore,
            test::helpers::{fixture_env, instantiate_msg, mk_deps},
            ContractError,
        };

        #[test]
        fn assigns_correct_values() {
            let mut deps = mk_deps();
            let creator = deps.api.addr_make("creator");
            let info = message_info(&creator, &coins(1, "uatom"));
            let msg = instantiate_msg();

            let res = instantiate(deps.as_mut(), fixture_env(), info, msg.clone()).unwrap();
            assert_eq!(0, res.messages.len());

            let actual_wasm_client_state_any_bz = deps
                .storage
                .get(store::CLIENT_STATE_KEY.as_bytes())
                .unwrap();
            let actual_wasm_client_state_any =
                Any::decode(actual_wasm_client_state_any_bz.as_slice()).unwrap();
            assert_eq!(
                WasmClientState::type_url(),
                actual_wasm_client_state_any.type_url
            );
            let actual_client_state =
                WasmClientState::decode(actual_wasm_client_state_any.value.as_slice()).unwrap();
            assert_eq!(msg.checksum, actual_client_state.checksum);
            assert_eq!(
                303_387,
                actual_client_state.latest_height.unwrap().revision_height
            );

            let store = HostStore(&deps.storage);
            let consensus_state =
                store::must_get_consensus_state(&store, Height::new(0, 303_387)).unwrap();
            let expected: ConsensusState = serde_json::from_slice(&msg.consensus_state).unwrap();
            assert_eq!(expected, consensus_state);

            let current = store::get_client_spos(&store, 2).unwrap();
            assert_eq!(current[0].vrf_key_hash, FIXTURE_VRF_KEY_HASH.to_uppercase());
            assert!(store.get(store::client_spos_key(3).as_bytes()).is_some());

            let version = cw2::get_contract_version(&deps.storage).unwrap();
            assert_eq!(env!("CARGO_PKG_NAME"), version.contract);
        }

        #[test]
        fn rejects_invalid_states() {
            let mut deps = mk_deps();
            let creator = deps.api.addr_make("creator");
            let info = message_info(&creator, &coins(1, "uatom"));

            let mut msg = instantiate_msg();
            msg.client_state = b"{}".into();
            assert!(matches!(
                instantiate(deps.as_mut(), mock_env(), info.clone(), msg),
                Err(ContractError::DeserializeClientStateFailed(_))
            ));

            let mut frozen = fixture_client_state();
            frozen.frozen_height = Height::new(0, 1);
            let msg = InstantiateMsg {
                client_state: serde_json::to_vec(&frozen).unwrap().into(),
                ..instantiate_msg()
            };
            assert!(matches!(
                instantiate(deps.as_mut(), fixture_env(), info, msg),
                Err(ContractError::InstantiateFailed(_))
            ));
        }
    }

    mod integration_tests {
        use cardano_light_client::{
            client_message::ClientMessage,
            misbehaviour::Misbehaviour,
            test_utils::{fixture_block_data, FIXTURE_TX_BODY_HASH},
        };
        use cosmwasm_std::Binary;

        use crate::{
            contract::{query, sudo},
            msg::{
                CheckForMisbehaviourMsg, CheckForMisbehaviourResult, Height, MigrateClientStoreMsg,
                QueryMsg, StatusMsg, StatusResult, SudoMsg, TimestampAtHeightMsg,
                TimestampAtHeightResult, UpdateStateMsg, UpdateStateOnMisbehaviourMsg,
                UpdateStateResult, VerifyClientMessageMsg,
            },
            sudo::{UTXO_INDEXED_EVENT, UTXO_INDEXED_KEY_ATTRIBUTE},
            test::helpers::{fixture_env, instantiated_deps},
            ContractError,
        };

        fn client_message(message: impl Into<ClientMessage>) -> Binary {
            serde_json::to_vec(&message.into()).unwrap().into()
        }

        fn status(deps: cosmwasm_std::Deps) -> String {
            let res = query(deps, fixture_env(), QueryMsg::Status(StatusMsg {})).unwrap();
            serde_json::from_slice::<StatusResult>(&res).unwrap().status
        }

        #[test]
        fn block_update_flow() {
            let mut deps = instantiated_deps();
            let block_data = fixture_block_data();
            let msg = client_message(block_data.clone());

            query(
                deps.as_ref(),
                fixture_env(),
                QueryMsg::VerifyClientMessage(VerifyClientMessageMsg {
                    client_message: msg.clone(),
                }),
            )
            .unwrap();

            let res = query(
                deps.as_ref(),
                fixture_env(),
                QueryMsg::CheckForMisbehaviour(CheckForMisbehaviourMsg {
                    client_message: msg.clone(),
                }),
            )
            .unwrap();
            let result: CheckForMisbehaviourResult = serde_json::from_slice(&res).unwrap();
            assert!(!result.found_misbehaviour);

            let res = sudo(
                deps.as_mut(),
                fixture_env(),
                SudoMsg::UpdateState(UpdateStateMsg {
                    client_message: msg,
                }),
            )
            .unwrap();
            let update_state_result: UpdateStateResult =
                serde_json::from_slice(&res.data.unwrap())
                    .expect("update state result should be deserializable");
            assert_eq!(
                vec![Height {
                    revision_number: 0,
                    revision_height: 303_388,
                }],
                update_state_result.heights
            );

            let event = res
                .events
                .iter()
                .find(|event| event.ty == UTXO_INDEXED_EVENT)
                .expect("indexed utxo event");
            let expected_key = format!("utxos/0-303388/{FIXTURE_TX_BODY_HASH}/1");
            assert!(event
                .attributes
                .iter()
                .any(|attr| attr.key == UTXO_INDEXED_KEY_ATTRIBUTE && attr.value == expected_key));

            let res = query(
                deps.as_ref(),
                fixture_env(),
                QueryMsg::TimestampAtHeight(TimestampAtHeightMsg {
                    height: Height {
                        revision_number: 0,
                        revision_height: 303_388,
                    },
                }),
            )
            .unwrap();
            let result: TimestampAtHeightResult = serde_json::from_slice(&res).unwrap();
            assert_eq!(block_data.timestamp * 1_000_000_000, result.timestamp);
            assert_eq!("Active", status(deps.as_ref()));
        }

        #[test]
        fn misbehaviour_freezes_the_client() {
            let mut deps = instantiated_deps();
            let block_data = fixture_block_data();
            let mut fork = block_data.clone();
            fork.hash = "00".repeat(32);
            let msg = client_message(Misbehaviour {
                client_id: "08-wasm-0".to_string(),
                block_data_1: block_data,
                block_data_2: fork,
            });

            let res = query(
                deps.as_ref(),
                fixture_env(),
                QueryMsg::CheckForMisbehaviour(CheckForMisbehaviourMsg {
                    client_message: msg.clone(),
                }),
            )
            .unwrap();
            let result: CheckForMisbehaviourResult = serde_json::from_slice(&res).unwrap();
            assert!(result.found_misbehaviour);

            sudo(
                deps.as_mut(),
                fixture_env(),
                SudoMsg::UpdateStateOnMisbehaviour(UpdateStateOnMisbehaviourMsg {
                    client_message: msg.clone(),
                }),
            )
            .unwrap();
            assert_eq!("Frozen", status(deps.as_ref()));

            // misbehaviour is never installed as an update
            assert!(matches!(
                sudo(
                    deps.as_mut(),
                    fixture_env(),
                    SudoMsg::UpdateState(UpdateStateMsg {
                        client_message: msg,
                    }),
                ),
                Err(ContractError::UpdateStateFailed(_))
            ));
        }

        #[test]
        fn malformed_client_message_is_rejected() {
            let deps = instantiated_deps();
            assert!(matches!(
                query(
                    deps.as_ref(),
                    fixture_env(),
                    QueryMsg::VerifyClientMessage(VerifyClientMessageMsg {
                        client_message: b"not json".into(),
                    }),
                ),
                Err(ContractError::DeserializeClientMessageFailed(_))
            ));
        }

        #[test]
        fn unsupported_sudo_messages() {
            let mut deps = instantiated_deps();
            assert!(matches!(
                sudo(
                    deps.as_mut(),
                    fixture_env(),
                    SudoMsg::MigrateClientStore(MigrateClientStoreMsg {}),
                ),
                Err(ContractError::NotImplemented(_))
            ));
        }
    }

    mod membership {
        use cardano_light_client::{
            cbor,
            error::CardanoClientError,
            store::{self, ClientStore},
            test_utils::{client_datum, tm_client_state},
        };
        use cosmwasm_std::Binary;
        use ibc_proto::google::protobuf::Any;
        use prost::Message;

        use crate::{
            contract::sudo,
            msg::{Height, MerklePath, SudoMsg, VerifyMembershipMsg, VerifyNonMembershipMsg},
            state::HostStoreMut,
            test::helpers::{fixture_env, instantiated_deps},
            ContractError,
        };

        const CLIENT_PROOF: &str = "0-303387/client/txhashdummy/0";
        const CLIENT_PATH: &str = "clients/07-tendermint-0/clientState";

        fn merkle_path(path: &str) -> MerklePath {
            MerklePath {
                key_path: vec![b"ibc".into(), Binary::from(path.as_bytes())],
            }
        }

        const fn trusted_height() -> Height {
            Height {
                revision_number: 0,
                revision_height: 303_387,
            }
        }

        fn membership_msg(delay_block_period: u64) -> SudoMsg {
            let datum = client_datum().client_state;
            SudoMsg::VerifyMembership(VerifyMembershipMsg {
                height: trusted_height(),
                delay_time_period: 0,
                delay_block_period,
                proof: CLIENT_PROOF.as_bytes().into(),
                merkle_path: merkle_path(CLIENT_PATH),
                value: Any::from_msg(&tm_client_state(&datum))
                    .unwrap()
                    .encode_to_vec()
                    .into(),
            })
        }

        #[test]
        fn indexed_client_state_is_proven() {
            let mut deps = instantiated_deps();
            let datum = client_datum().client_state;
            HostStoreMut(&mut deps.storage).set(
                store::utxo_key(CLIENT_PROOF).as_bytes(),
                &cbor::to_vec(&datum).unwrap(),
            );

            sudo(deps.as_mut(), fixture_env(), membership_msg(0)).unwrap();

            let mut env = fixture_env();
            assert!(matches!(
                sudo(deps.as_mut(), env.clone(), membership_msg(5)),
                Err(ContractError::VerifyMembershipFailed(
                    CardanoClientError::DelayPeriodNotPassed { .. }
                ))
            ));
            env.block.height += 5;
            sudo(deps.as_mut(), env, membership_msg(5)).unwrap();
        }

        #[test]
        fn missing_receipt_is_proven_absent() {
            let mut deps = instantiated_deps();
            let path = "receipts/ports/transfer/channels/channel-0/sequences/1";
            let msg = || {
                SudoMsg::VerifyNonMembership(VerifyNonMembershipMsg {
                    height: trusted_height(),
                    delay_time_period: 0,
                    delay_block_period: 0,
                    proof: b"0-303387/receipts/txhashdummy/0".into(),
                    merkle_path: merkle_path(path),
                })
            };
            sudo(deps.as_mut(), fixture_env(), msg()).unwrap();

            HostStoreMut(&mut deps.storage).set(
                store::utxo_key("0-303387/receipts/txhashdummy/0/transfer/channel-0/1").as_bytes(),
                &[1],
            );
            assert!(matches!(
                sudo(deps.as_mut(), fixture_env(), msg()),
                Err(ContractError::VerifyNonMembershipFailed(_))
            ));
        }

        #[test]
        fn empty_merkle_path_is_rejected() {
            let mut deps = instantiated_deps();
            let msg = SudoMsg::VerifyNonMembership(VerifyNonMembershipMsg {
                height: trusted_height(),
                delay_time_period: 0,
                delay_block_period: 0,
                proof: CLIENT_PROOF.as_bytes().into(),
                merkle_path: MerklePath { key_path: vec![] },
            });
            assert!(matches!(
                sudo(deps.as_mut(), fixture_env(), msg),
                Err(ContractError::InvalidMerklePath(_))
            ));
        }
    }
}
