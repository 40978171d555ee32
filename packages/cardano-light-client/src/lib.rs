#![doc = include_str!("../README.md")]
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

/// Returns early with `$err` unless `$cond` holds
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}

pub mod block;
pub mod block_data;
pub mod cbor;
pub mod client_message;
pub mod client_state;
pub mod consensus_state;
pub mod context;
pub mod counterparty;
pub mod crypto;
pub mod datum;
pub mod error;
pub mod header;
pub mod height;
pub mod membership;
pub mod misbehaviour;
pub mod mithril;
pub mod pool;
pub mod status;
pub mod store;
pub mod tx;
pub mod update;
pub mod utxo;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::CardanoClientError;
pub use height::Height;
