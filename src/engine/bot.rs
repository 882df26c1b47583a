use crate::config::Config;
use crate::engine::filter::Filter;
use crate::ts3::{QueryError, ServerQuery};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum BotError {
    /// Connecting, logging in or selecting the virtual server failed.
    #[error("Failed to connect to the server: {0}")]
    Connect(#[source] QueryError),

    #[error("Poll cycle failed: {0}")]
    Tick(#[source] QueryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Connecting,
    Polling,
}

/// Counters for one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub seen: usize,
    pub relocated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct AfkBot<Q: ServerQuery> {
    query: Q,
    filter: Filter,
    server_id: u32,
    interval: Duration,
    error_cooldown: Duration,
    state: BotState,
}

impl<Q: ServerQuery> AfkBot<Q> {
    pub fn new(config: &Config, query: Q) -> Self {
        Self {
            query,
            filter: Filter::from_config(&config.afk),
            server_id: config.server.virtual_server_id,
            interval: config.polling.interval(),
            error_cooldown: config.polling.error_cooldown(),
            state: BotState::Connecting,
        }
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub async fn connect(&mut self) -> Result<(), BotError> {
        self.state = BotState::Connecting;
        self.query.connect().await.map_err(BotError::Connect)?;

        if let Err(e) = self.query.select_server(self.server_id).await {
            self.query.disconnect().await;
            return Err(BotError::Connect(e));
        }

        self.state = BotState::Polling;
        Ok(())
    }

    /// Polls until `shutdown` flips to `true`. Only connection failures are returned.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), BotError> {
        info!(
            "AFK bot starting: {} mode, AFK channel {}, polling every {}s",
            self.filter.mode(),
            self.filter.afk_channel(),
            self.interval.as_secs()
        );

        while !*shutdown.borrow() {
            if self.state == BotState::Connecting {
                self.connect().await?;
            }

            let delay = match self.tick().await {
                Ok(report) => {
                    debug!("Tick finished: {:?}", report);
                    self.interval
                }
                Err(e) => {
                    error!("An error occurred during the poll cycle: {}", e);
                    if e.is_connection_lost() {
                        warn!("ServerQuery session lost, reconnecting after cooldown");
                        self.state = BotState::Connecting;
                    }
                    self.error_cooldown
                }
            };

            if !pause(delay, &mut shutdown).await {
                break;
            }
        }

        info!("Shutdown requested, disconnecting.");
        self.query.disconnect().await;
        Ok(())
    }

    /// Connects, runs a single poll cycle and disconnects.
    pub async fn run_once(&mut self) -> Result<TickReport, BotError> {
        self.connect().await?;
        let result = self.tick().await.map_err(BotError::Tick);
        self.query.disconnect().await;
        result
    }

    /// One poll cycle. Per-client failures are logged and counted; only
    /// roster failures and lost sessions end the cycle early.
    pub async fn tick(&mut self) -> Result<TickReport, QueryError> {
        let clients = self.query.list_clients().await?;
        let mut report = TickReport::default();

        if clients.is_empty() {
            info!("No clients were retrieved from the server.");
            return Ok(report);
        }

        for entry in &clients {
            report.seen += 1;

            if entry.is_query_client() {
                debug!("Skipping query client {} (ID: {})", entry.nickname, entry.clid);
                report.skipped += 1;
                continue;
            }

            let info = match self.query.client_info(entry.clid).await {
                Ok(Some(info)) => info,
                Ok(None) => {
                    warn!("No info retrieved for client with ID {}", entry.clid);
                    report.skipped += 1;
                    continue;
                }
                Err(e) if e.is_connection_lost() => return Err(e),
                Err(e) => {
                    error!("An error occurred while processing client with ID {}: {}", entry.clid, e);
                    report.failed += 1;
                    continue;
                }
            };

            if !self.filter.should_relocate(&info) {
                continue;
            }

            match self.query.move_client(entry.clid, self.filter.afk_channel()).await {
                Ok(()) => {
                    info!("Moved client {} (ID: {}) to AFK channel.", info.nickname, entry.clid);
                    report.relocated += 1;
                }
                Err(e) if e.is_connection_lost() => return Err(e),
                Err(e) => {
                    error!(
                        "An error occurred while moving client {} (ID: {}) to AFK channel: {}",
                        info.nickname, entry.clid, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Sleeps for `delay`. Returns `false` if shutdown was requested meanwhile.
async fn pause(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender gone, nobody can ask for shutdown any more.
                    (&mut sleep).await;
                    return true;
                }
                if *shutdown.borrow() {
                    return false;
                }
            }
        }
    }
}
