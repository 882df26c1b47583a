use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::Config;
use crate::ts3::codec::{build_command, parse_records, parse_status, Record};
use crate::ts3::error::{QueryError, ERR_INVALID_CLIENT_ID};
use crate::ts3::types::{ChannelEntry, ChannelId, ClientEntry, ClientId, ClientInfo};
use crate::ts3::ServerQuery;

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    /// Reads one line with `\r`/`\n` stripped from both ends.
    async fn read_line(&mut self, limit: Duration) -> Result<String, QueryError> {
        let mut buf = String::new();
        let n = timeout(limit, self.reader.read_line(&mut buf))
            .await
            .map_err(|_| QueryError::Timeout)??;
        if n == 0 {
            return Err(QueryError::Closed);
        }
        Ok(buf.trim_matches(|c| c == '\r' || c == '\n').to_string())
    }

    /// Reads the next line that carries content.
    async fn next_line(&mut self, limit: Duration) -> Result<String, QueryError> {
        loop {
            let line = self.read_line(limit).await?;
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }

    async fn send(&mut self, line: &str) -> Result<(), QueryError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// TCP ServerQuery client.
pub struct QueryClient {
    addr: String,
    username: String,
    password: String,
    request_timeout: Duration,
    conn: Option<Connection>,
}

impl QueryClient {
    pub fn new(addr: String, username: String, password: String, request_timeout: Duration) -> Self {
        Self {
            addr,
            username,
            password,
            request_timeout,
            conn: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.server.socket_addr(),
            config.server.username.clone(),
            config.server.password.clone(),
            config.polling.request_timeout(),
        )
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn request(&mut self, line: &str) -> Result<Vec<Record>, QueryError> {
        let result = self.exchange(line).await;
        if let Err(e) = &result {
            if e.is_connection_lost() {
                self.conn = None;
            }
        }
        result
    }

    async fn exchange(&mut self, line: &str) -> Result<Vec<Record>, QueryError> {
        let limit = self.request_timeout;
        let conn = self.conn.as_mut().ok_or(QueryError::NotConnected)?;

        if line.starts_with("login ") {
            debug!("> login <redacted>");
        } else {
            debug!("> {}", line);
        }
        conn.send(line).await?;

        let mut records = Vec::new();
        loop {
            let reply = conn.next_line(limit).await?;
            if reply.starts_with("notify") {
                continue;
            }
            if let Some(status) = parse_status(&reply) {
                status.into_result()?;
                return Ok(records);
            }
            debug!("< {}", reply);
            records.extend(parse_records(&reply));
        }
    }

    async fn open(&mut self) -> Result<(), QueryError> {
        let stream = match timeout(self.request_timeout, TcpStream::connect(&self.addr)).await {
            Err(_) => return Err(QueryError::Timeout),
            Ok(Err(source)) => {
                return Err(QueryError::Connect { addr: self.addr.clone(), source });
            }
            Ok(Ok(stream)) => stream,
        };

        let (read_half, writer) = stream.into_split();
        let mut conn = Connection { reader: BufReader::new(read_half), writer };

        let banner = conn.next_line(self.request_timeout).await?;
        if banner != "TS3" {
            return Err(QueryError::Protocol(format!("unexpected banner: {banner}")));
        }
        // "Welcome to the TeamSpeak 3 ServerQuery interface..."
        conn.next_line(self.request_timeout).await?;

        self.conn = Some(conn);
        Ok(())
    }
}

#[async_trait]
impl ServerQuery for QueryClient {
    async fn connect(&mut self) -> Result<(), QueryError> {
        info!("Connecting to ServerQuery at {}...", self.addr);
        self.open().await?;

        let login = build_command(
            "login",
            &[
                ("client_login_name", self.username.clone()),
                ("client_login_password", self.password.clone()),
            ],
        );
        if let Err(e) = self.request(&login).await {
            self.conn = None;
            return Err(e);
        }
        info!("Logged in as {}", self.username);
        Ok(())
    }

    async fn select_server(&mut self, server_id: u32) -> Result<(), QueryError> {
        self.request(&build_command("use", &[("sid", server_id.to_string())]))
            .await?;
        info!("Selected virtual server {}", server_id);
        Ok(())
    }

    async fn list_clients(&mut self) -> Result<Vec<ClientEntry>, QueryError> {
        let records = self.request("clientlist -times").await?;
        records.iter().map(ClientEntry::try_from).collect()
    }

    async fn client_info(&mut self, clid: ClientId) -> Result<Option<ClientInfo>, QueryError> {
        let line = build_command("clientinfo", &[("clid", clid.to_string())]);
        match self.request(&line).await {
            Ok(records) => records.first().map(ClientInfo::try_from).transpose(),
            Err(QueryError::Server { id: ERR_INVALID_CLIENT_ID, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn move_client(&mut self, clid: ClientId, cid: ChannelId) -> Result<(), QueryError> {
        let line = build_command(
            "clientmove",
            &[("clid", clid.to_string()), ("cid", cid.to_string())],
        );
        self.request(&line).await?;
        Ok(())
    }

    async fn list_channels(&mut self) -> Result<Vec<ChannelEntry>, QueryError> {
        let records = self.request("channellist").await?;
        records.iter().map(ChannelEntry::try_from).collect()
    }

    async fn disconnect(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.send("quit").await {
                warn!("Failed to send quit: {}", e);
            }
            let _ = conn.writer.shutdown().await;
            info!("Disconnected from {}", self.addr);
        }
    }
}
