//! What the client needs to know about the chain hosting it

use crate::height::Height;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Time and height of the host block executing the current message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostContext {
    /// Host block time in unix nanoseconds
    pub block_time_ns: u64,
    /// Host block height
    pub block_height: Height,
}

impl HostContext {
    /// Host block time in unix seconds
    #[must_use]
    pub const fn block_time_secs(&self) -> u64 {
        self.block_time_ns / NANOS_PER_SECOND
    }
}
