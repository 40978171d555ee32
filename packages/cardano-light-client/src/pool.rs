//! Stake pool set engine.
//!
//! Registrations seen in a block of epoch `E` take effect in `E + 1`. Retirements declaring
//! epoch `R` take effect in `R + 2`. Both are journaled under the epoch they take effect in and
//! replayed onto the previous pool set when the client crosses into that epoch.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    crypto,
    error::CardanoClientError,
    store::{self, ClientStore, ClientStoreRead},
};

/// Epochs between a block carrying a registration and the registration taking effect
pub const REGISTRATION_DELAY: u64 = 1;
/// Epochs between a declared retirement epoch and the retirement taking effect
pub const RETIREMENT_DELAY: u64 = 2;

/// A stake pool allowed to produce blocks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Validator {
    /// Hex blake2b-256 of the pool's VRF verification key
    pub vrf_key_hash: String,
    /// Bech32 pool id
    pub pool_id: String,
}

/// A pool registration certificate found in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistration {
    /// Bech32 pool id
    pub pool_id: String,
    /// Hex VRF key hash declared by the certificate
    pub vrf_key_hash: String,
    /// Index of the carrying transaction in its block
    pub tx_index: u64,
}

/// A pool retirement certificate found in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRetirement {
    /// Bech32 pool id
    pub pool_id: String,
    /// Epoch declared by the certificate
    pub retire_epoch: u64,
    /// Index of the carrying transaction in its block
    pub tx_index: u64,
}

/// Journal entry of a pool event scheduled for an epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpoState {
    /// Registration when set, retirement otherwise
    pub is_regis_cert: bool,
    /// Bech32 pool id
    pub pool_id: String,
    /// VRF key hash of a registration, empty for a retirement
    pub pool_vrf: String,
    /// Block number that carried the certificate
    pub block_no: u64,
    /// Index of the carrying transaction in its block
    pub tx_index: u64,
}

/// Whether any pool in `validators` has the VRF key hash `vrf_key_hash`, ignoring case
#[must_use]
pub fn contains_vrf(validators: &[Validator], vrf_key_hash: &str) -> bool {
    validators
        .iter()
        .any(|v| v.vrf_key_hash.eq_ignore_ascii_case(vrf_key_hash))
}

/// Whether the blake2b-256 of `vrf_vkey` belongs to a pool in `validators`
#[must_use]
pub fn contains_vrf_key(validators: &[Validator], vrf_vkey: &[u8]) -> bool {
    contains_vrf(validators, &hex::encode(crypto::blake2b_256(vrf_vkey)))
}

/// Journals the registrations of a block of `block_epoch` for the next epoch
///
/// # Errors
/// Returns an error if the journal cannot be read or written.
pub fn schedule_registrations<S: ClientStore + ?Sized>(
    store: &mut S,
    registrations: &[PoolRegistration],
    block_epoch: u64,
    block_no: u64,
) -> Result<(), CardanoClientError> {
    if registrations.is_empty() {
        return Ok(());
    }
    let epoch = block_epoch.saturating_add(REGISTRATION_DELAY);
    let mut journal = store::get_spo_state(store, epoch)?;
    journal.extend(registrations.iter().map(|r| SpoState {
        is_regis_cert: true,
        pool_id: r.pool_id.clone(),
        pool_vrf: r.vrf_key_hash.clone(),
        block_no,
        tx_index: r.tx_index,
    }));
    debug!(epoch, count = registrations.len(), "scheduled pool registrations");
    store::set_spo_state(store, epoch, &journal)
}

/// Journals each retirement for two epochs after the epoch it declares
///
/// # Errors
/// Returns an error if a journal cannot be read or written.
pub fn schedule_retirements<S: ClientStore + ?Sized>(
    store: &mut S,
    retirements: &[PoolRetirement],
    block_no: u64,
) -> Result<(), CardanoClientError> {
    for retirement in retirements {
        let epoch = retirement.retire_epoch.saturating_add(RETIREMENT_DELAY);
        let mut journal = store::get_spo_state(store, epoch)?;
        journal.push(SpoState {
            is_regis_cert: false,
            pool_id: retirement.pool_id.clone(),
            pool_vrf: String::new(),
            block_no,
            tx_index: retirement.tx_index,
        });
        debug!(epoch, pool_id = %retirement.pool_id, "scheduled pool retirement");
        store::set_spo_state(store, epoch, &journal)?;
    }
    Ok(())
}

/// Replays a journal onto a pool set, in `(block_no, tx_index)` order
pub fn apply_events(validators: &mut Vec<Validator>, events: &[SpoState]) {
    let mut ordered: Vec<&SpoState> = events.iter().collect();
    ordered.sort_by_key(|e| (e.block_no, e.tx_index));

    for event in ordered {
        let existing = validators
            .iter()
            .position(|v| v.pool_id.eq_ignore_ascii_case(&event.pool_id));
        match (event.is_regis_cert, existing) {
            (true, Some(i)) => validators[i].vrf_key_hash.clone_from(&event.pool_vrf),
            (true, None) => validators.push(Validator {
                vrf_key_hash: event.pool_vrf.clone(),
                pool_id: event.pool_id.clone(),
            }),
            (false, Some(i)) => {
                validators.remove(i);
            }
            (false, None) => {}
        }
    }
}

/// Computes the pool set of `new_epoch` from the recorded set of `old_epoch`
///
/// Every journal between the two epochs is replayed, so skipped epochs are not lost. Moving
/// back to an earlier epoch reuses the set recorded for it.
///
/// # Errors
/// Returns [`CardanoClientError::InvalidSposNewEpoch`] when moving back to an epoch without a
/// recorded set, or a store error.
pub fn derive_new_epoch<S: ClientStoreRead + ?Sized>(
    store: &S,
    old_epoch: u64,
    new_epoch: u64,
) -> Result<Vec<Validator>, CardanoClientError> {
    if new_epoch <= old_epoch {
        if !store::has_client_spos(store, new_epoch) {
            return Err(CardanoClientError::InvalidSposNewEpoch { epoch: new_epoch });
        }
        return store::get_client_spos(store, new_epoch);
    }

    let mut validators = store::get_client_spos(store, old_epoch)?;
    for epoch in old_epoch + 1..=new_epoch {
        apply_events(&mut validators, &store::get_spo_state(store, epoch)?);
    }
    Ok(validators)
}

/// Derives the pool set of `new_epoch`, checks that the block producer belongs to it and records it
///
/// # Errors
/// Returns [`CardanoClientError::InvalidSposNewEpoch`] if no pool of the derived set has
/// `vrf_key_hash`.
pub fn roll_epoch<S: ClientStore + ?Sized>(
    store: &mut S,
    old_epoch: u64,
    new_epoch: u64,
    vrf_key_hash: &str,
) -> Result<Vec<Validator>, CardanoClientError> {
    let validators = derive_new_epoch(store, old_epoch, new_epoch)?;
    if !contains_vrf(&validators, vrf_key_hash) {
        return Err(CardanoClientError::InvalidSposNewEpoch { epoch: new_epoch });
    }
    store::set_client_spos(store, new_epoch, &validators)?;
    info!(old_epoch, new_epoch, pools = validators.len(), "rolled stake pool set");
    Ok(validators)
}
