//! TeamSpeak 3 ServerQuery transport.

pub mod client;
pub mod codec;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::QueryClient;
pub use error::QueryError;
pub use types::{ChannelEntry, ChannelId, ClientEntry, ClientId, ClientInfo};

/// Operations the bot needs from a ServerQuery session.
#[async_trait]
pub trait ServerQuery: Send {
    /// Opens the connection and logs in.
    async fn connect(&mut self) -> Result<(), QueryError>;

    /// Selects the virtual server (`use sid=N`).
    async fn select_server(&mut self, server_id: u32) -> Result<(), QueryError>;

    async fn list_clients(&mut self) -> Result<Vec<ClientEntry>, QueryError>;

    /// Detail for one client. `None` when the server no longer knows the id.
    async fn client_info(&mut self, clid: ClientId) -> Result<Option<ClientInfo>, QueryError>;

    async fn move_client(&mut self, clid: ClientId, cid: ChannelId) -> Result<(), QueryError>;

    async fn list_channels(&mut self) -> Result<Vec<ChannelEntry>, QueryError>;

    /// Sends `quit` and drops the session. Never fails.
    async fn disconnect(&mut self);
}
