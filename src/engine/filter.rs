use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::AfkConfig;
use crate::ts3::types::{ChannelId, ClientInfo};

/// Whether the configured channel set is included or excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    AllowList,
    DenyList,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow-list" => Ok(Self::AllowList),
            "deny-list" => Ok(Self::DenyList),
            other => Err(format!("expected 'allow-list' or 'deny-list', got '{other}'")),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowList => f.write_str("allow-list"),
            Self::DenyList => f.write_str("deny-list"),
        }
    }
}

/// Decides which clients get moved to the AFK channel.
#[derive(Debug, Clone)]
pub struct Filter {
    mode: FilterMode,
    channels: HashSet<ChannelId>,
    afk_channel: ChannelId,
    idle_threshold_ms: u64,
}

impl Filter {
    pub fn new(
        mode: FilterMode,
        channels: impl IntoIterator<Item = ChannelId>,
        afk_channel: ChannelId,
        idle_threshold_ms: u64,
    ) -> Self {
        Self {
            mode,
            channels: channels.into_iter().collect(),
            afk_channel,
            idle_threshold_ms,
        }
    }

    pub fn from_config(config: &AfkConfig) -> Self {
        Self::new(
            config.mode,
            config.channel_ids.iter().copied(),
            config.afk_channel_id,
            config.idle_threshold_ms,
        )
    }

    pub fn afk_channel(&self) -> ChannelId {
        self.afk_channel
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Strictly greater than the threshold; equal is not idle.
    pub fn is_idle(&self, idle_ms: u64) -> bool {
        idle_ms > self.idle_threshold_ms
    }

    /// Channel eligibility alone, ignoring idle time.
    pub fn should_process_channel(&self, cid: ChannelId) -> bool {
        if cid == self.afk_channel {
            return false;
        }
        let listed = self.channels.contains(&cid);
        match self.mode {
            FilterMode::DenyList => !listed,
            FilterMode::AllowList => listed,
        }
    }

    pub fn should_relocate(&self, client: &ClientInfo) -> bool {
        self.is_idle(client.idle_ms) && self.should_process_channel(client.cid)
    }
}
