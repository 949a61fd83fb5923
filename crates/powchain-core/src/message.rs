use crate::{error::ProtocolDecodeError, Block};
use serde::{Deserialize, Serialize};

pub const QUERY_LATEST: u8 = 0;
pub const QUERY_ALL: u8 = 1;
pub const RESPONSE_BLOCKCHAIN: u8 = 2;

/// A peer-to-peer gossip message.
///
/// A `Response` with one block is treated as "latest only" and one with more
/// as a full chain; the wire format carries no other distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    QueryLatest,
    QueryAll,
    Response(Vec<Block>),
}

/// On-the-wire shape: `{"type": n}` plus, for responses, `data` holding the
/// block array as JSON *text*.
#[derive(Serialize, Deserialize)]
struct Frame {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

impl Message {
    pub fn kind(&self) -> u8 {
        match self {
            Message::QueryLatest => QUERY_LATEST,
            Message::QueryAll => QUERY_ALL,
            Message::Response(_) => RESPONSE_BLOCKCHAIN,
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        let data = match self {
            Message::Response(blocks) => Some(serde_json::to_string(blocks)?),
            Message::QueryLatest | Message::QueryAll => None,
        };
        serde_json::to_string(&Frame {
            kind: self.kind(),
            data,
        })
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolDecodeError> {
        let frame: Frame = serde_json::from_str(text)?;
        match frame.kind {
            QUERY_LATEST => Ok(Message::QueryLatest),
            QUERY_ALL => Ok(Message::QueryAll),
            RESPONSE_BLOCKCHAIN => {
                let data = frame.data.ok_or(ProtocolDecodeError::MissingData)?;
                let blocks: Vec<Block> = serde_json::from_str(&data)?;
                if blocks.is_empty() {
                    return Err(ProtocolDecodeError::EmptyResponse);
                }
                Ok(Message::Response(blocks))
            }
            other => Err(ProtocolDecodeError::UnknownType(other)),
        }
    }
}
