//! Mithril certified state: transaction proofs, the HostState datum and Mithril headers

pub mod header;
pub mod host_state;
pub mod mmr;
pub mod proof;
