use serde::{Deserialize, Serialize};

use crate::ts3::codec::Record;
use crate::ts3::error::QueryError;

pub type ClientId = u32;
pub type ChannelId = u64;

/// `client_type` value of ServerQuery sessions.
pub const CLIENT_TYPE_QUERY: u8 = 1;

/// One row of `clientlist -times`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub clid: ClientId,
    pub cid: ChannelId,
    pub nickname: String,
    pub client_type: u8,
    pub idle_ms: Option<u64>,
}

impl ClientEntry {
    pub fn is_query_client(&self) -> bool {
        self.client_type == CLIENT_TYPE_QUERY
    }
}

impl TryFrom<&Record> for ClientEntry {
    type Error = QueryError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            clid: record.parse("clid")?,
            cid: record.parse("cid")?,
            nickname: record.get("client_nickname").unwrap_or_default().to_string(),
            client_type: record.parse_opt("client_type")?.unwrap_or(0),
            idle_ms: record.parse_opt("client_idle_time")?,
        })
    }
}

/// Detail returned by `clientinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub cid: ChannelId,
    pub nickname: String,
    pub idle_ms: u64,
}

impl TryFrom<&Record> for ClientInfo {
    type Error = QueryError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            cid: record.parse("cid")?,
            nickname: record.get("client_nickname").unwrap_or("Unknown").to_string(),
            idle_ms: record.parse("client_idle_time")?,
        })
    }
}

/// One row of `channellist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub cid: ChannelId,
    pub parent_cid: ChannelId,
    pub name: String,
}

impl TryFrom<&Record> for ChannelEntry {
    type Error = QueryError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            cid: record.parse("cid")?,
            parent_cid: record.parse_opt("pid")?.unwrap_or(0),
            name: record.get("channel_name").unwrap_or_default().to_string(),
        })
    }
}
