//! Messages a relayer submits to the client

use serde::{Deserialize, Serialize};

use crate::{
    block_data::BlockData, error::CardanoClientError, misbehaviour::Misbehaviour,
    mithril::header::MithrilHeader,
};

/// A client message, JSON encoded with the variant name as the tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    /// A new block
    HeaderBlockData(BlockData),
    /// Evidence of conflicting blocks
    Misbehaviour(Box<Misbehaviour>),
    /// A Mithril certified HostState update
    MithrilHeader(MithrilHeader),
}

impl ClientMessage {
    /// Decodes a JSON client message
    ///
    /// # Errors
    /// Returns [`CardanoClientError::Json`] on malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, CardanoClientError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<BlockData> for ClientMessage {
    fn from(block_data: BlockData) -> Self {
        Self::HeaderBlockData(block_data)
    }
}

impl From<Misbehaviour> for ClientMessage {
    fn from(misbehaviour: Misbehaviour) -> Self {
        Self::Misbehaviour(Box::new(misbehaviour))
    }
}

impl From<MithrilHeader> for ClientMessage {
    fn from(header: MithrilHeader) -> Self {
        Self::MithrilHeader(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixture_block_data;

    #[test]
    fn variants_are_tagged_in_snake_case() {
        let msg = ClientMessage::from(fixture_block_data());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("header_block_data").is_some());

        let bytes = serde_json::to_vec(&msg).unwrap();
        assert_eq!(ClientMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            ClientMessage::decode(b"{\"unknown\":{}}"),
            Err(CardanoClientError::Json(_))
        ));
    }
}
