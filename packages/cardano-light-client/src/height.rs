//! This module defines [`Height`].

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CardanoClientError;

/// IBC height of the counterparty chain. For Cardano the revision height is the block number.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Default,
)]
pub struct Height {
    /// The revision number, parsed from the chain id suffix
    #[serde(default)]
    pub revision_number: u64,
    /// The block number
    #[serde(default)]
    pub revision_height: u64,
}

impl Height {
    /// Creates a new height
    #[must_use]
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// The height a frozen client is pinned to
    #[must_use]
    pub const fn frozen() -> Self {
        Self::new(0, 1)
    }

    /// Height zero means "unset"
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }

    /// Next height in the same revision
    #[must_use]
    pub const fn increment(self) -> Self {
        Self::new(self.revision_number, self.revision_height.saturating_add(1))
    }

    /// Previous height in the same revision, `None` when the revision height is zero
    #[must_use]
    pub const fn decrement(self) -> Option<Self> {
        match self.revision_height.checked_sub(1) {
            Some(h) => Some(Self::new(self.revision_number, h)),
            None => None,
        }
    }

    /// Big endian `revision || height`, used as the sortable suffix of the iteration index
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.revision_number.to_be_bytes());
        out[8..].copy_from_slice(&self.revision_height.to_be_bytes());
        out
    }

    /// Inverse of [`Height::to_be_bytes`]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        let mut rev = [0u8; 8];
        let mut h = [0u8; 8];
        rev.copy_from_slice(&bytes[..8]);
        h.copy_from_slice(&bytes[8..]);
        Self::new(u64::from_be_bytes(rev), u64::from_be_bytes(h))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

impl FromStr for Height {
    type Err = CardanoClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rev, height) = s
            .split_once('-')
            .ok_or_else(|| CardanoClientError::InvalidHeight {
                reason: format!("expected <revision>-<height>, got {s:?}"),
            })?;
        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|e| CardanoClientError::InvalidHeight {
                    reason: format!("{s:?}: {e}"),
                })
        };
        Ok(Self::new(parse(rev)?, parse(height)?))
    }
}

/// Parses the revision number out of a chain id of the form `{name}-{revision}`.
///
/// Chain ids that are not in that format have revision 0.
#[must_use]
pub fn parse_chain_id_revision(chain_id: &str) -> u64 {
    let Some((name, revision)) = chain_id.rsplit_once('-') else {
        return 0;
    };
    let well_formed = !name.is_empty()
        && !name.ends_with('-')
        && !name.ends_with('\n')
        && revision.bytes().all(|b| b.is_ascii_digit())
        && revision.bytes().next().is_some_and(|b| b != b'0');
    if !well_formed {
        return 0;
    }
    revision.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn heights_order_lexicographically() {
        let mut heights = vec![
            Height::new(1, 0),
            Height::new(0, 10),
            Height::new(0, 2),
            Height::new(1, 5),
        ];
        heights.sort();
        assert_eq!(
            heights,
            vec![
                Height::new(0, 2),
                Height::new(0, 10),
                Height::new(1, 0),
                Height::new(1, 5),
            ]
        );
        assert!(Height::new(0, u64::MAX) < Height::new(1, 0));
    }

    #[test]
    fn increment_then_decrement_is_identity() {
        for h in [Height::new(0, 1), Height::new(3, 303_388), Height::new(7, 0)] {
            assert_eq!(h.increment().decrement(), Some(h));
        }
        assert_eq!(Height::new(0, 0).decrement(), None);
    }

    #[test]
    fn string_form_parses_back() {
        let h = Height::new(2, 303_388);
        assert_eq!(h.to_string(), "2-303388");
        assert_eq!("2-303388".parse::<Height>().unwrap(), h);

        assert!("303388".parse::<Height>().is_err());
        assert!("a-1".parse::<Height>().is_err());
        assert!("1-".parse::<Height>().is_err());
    }

    #[test]
    fn big_endian_bytes_sort_like_heights() {
        let a = Height::new(0, 255);
        let b = Height::new(0, 256);
        let c = Height::new(1, 0);
        assert!(a.to_be_bytes() < b.to_be_bytes());
        assert!(b.to_be_bytes() < c.to_be_bytes());
        assert_eq!(Height::from_be_bytes(b.to_be_bytes()), b);
    }

    #[rstest]
    #[case("1", 0)]
    #[case("cardano-1", 1)]
    #[case("cardano-42", 42)]
    #[case("cardano-0", 0)]
    #[case("cardano-01", 0)]
    #[case("-5", 0)]
    #[case("cardano--5", 0)]
    #[case("preprod-testnet-3", 3)]
    #[case("cardano-x", 0)]
    fn chain_id_revision(#[case] chain_id: &str, #[case] revision: u64) {
        assert_eq!(parse_chain_id_revision(chain_id), revision);
    }
}
