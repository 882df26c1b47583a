//! Read-only listings backing the `afkctl` commands.

use chrono::Duration as ChronoDuration;

use crate::engine::filter::Filter;
use crate::ts3::{ChannelEntry, ClientEntry, QueryError, ServerQuery};

/// Voice clients sitting in one channel that passes the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    pub channel: ChannelEntry,
    pub clients: Vec<ClientEntry>,
}

pub async fn list_channels<Q: ServerQuery>(query: &mut Q) -> Result<Vec<ChannelEntry>, QueryError> {
    query.list_channels().await
}

/// Groups the current roster by the channels the filter would act on.
/// An empty result with an empty roster is distinguished by the caller.
pub async fn idle_users<Q: ServerQuery>(
    query: &mut Q,
    filter: &Filter,
) -> Result<(Vec<ClientEntry>, Vec<ChannelGroup>), QueryError> {
    let clients = query.list_clients().await?;
    if clients.is_empty() {
        return Ok((clients, Vec::new()));
    }
    let channels = query.list_channels().await?;
    let groups = group_by_channel(&clients, &channels, filter);
    Ok((clients, groups))
}

pub fn group_by_channel(
    clients: &[ClientEntry],
    channels: &[ChannelEntry],
    filter: &Filter,
) -> Vec<ChannelGroup> {
    channels
        .iter()
        .filter(|channel| filter.should_process_channel(channel.cid))
        .map(|channel| ChannelGroup {
            channel: channel.clone(),
            clients: clients
                .iter()
                .filter(|c| c.cid == channel.cid && !c.is_query_client())
                .cloned()
                .collect(),
        })
        .collect()
}

/// Renders an idle time as `1h 02m 03s`, `4m 05s` or `7s`.
pub fn format_idle(idle_ms: Option<u64>) -> String {
    let Some(ms) = idle_ms else {
        return "unknown".to_string();
    };

    let duration = ChronoDuration::milliseconds(ms.min(i64::MAX as u64) as i64);
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    let seconds = duration.num_seconds() % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::filter::FilterMode;

    fn channel(cid: u64, name: &str) -> ChannelEntry {
        ChannelEntry { cid, parent_cid: 0, name: name.to_string() }
    }

    fn client(clid: u32, cid: u64, client_type: u8, idle_ms: u64) -> ClientEntry {
        ClientEntry {
            clid,
            cid,
            nickname: format!("user{clid}"),
            client_type,
            idle_ms: Some(idle_ms),
        }
    }

    fn channels() -> Vec<ChannelEntry> {
        vec![channel(1, "Lobby"), channel(2, "AFK"), channel(3, "Gaming"), channel(4, "Music")]
    }

    #[test]
    fn deny_list_groups_exclude_listed_and_afk_channels() {
        let filter = Filter::new(FilterMode::DenyList, [3], 2, 0);
        let clients = vec![client(10, 1, 0, 500), client(11, 2, 0, 900), client(12, 3, 0, 100)];

        let groups = group_by_channel(&clients, &channels(), &filter);
        let names: Vec<&str> = groups.iter().map(|g| g.channel.name.as_str()).collect();
        assert_eq!(names, vec!["Lobby", "Music"]);
        assert_eq!(groups[0].clients.len(), 1);
        assert_eq!(groups[0].clients[0].clid, 10);
        assert!(groups[1].clients.is_empty());
    }

    #[test]
    fn allow_list_groups_only_listed_channels() {
        let filter = Filter::new(FilterMode::AllowList, [3, 4], 2, 0);
        let clients = vec![client(10, 3, 0, 500), client(1, 3, 1, 0)];

        let groups = group_by_channel(&clients, &channels(), &filter);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].channel.cid, 3);
        // Query clients are left out.
        assert_eq!(groups[0].clients.len(), 1);
    }

    #[test]
    fn format_idle_renders_units() {
        assert_eq!(format_idle(None), "unknown");
        assert_eq!(format_idle(Some(7_000)), "7s");
        assert_eq!(format_idle(Some(245_000)), "4m 05s");
        assert_eq!(format_idle(Some(3_723_000)), "1h 02m 03s");
        assert_eq!(format_idle(Some(999)), "0s");
    }
}
