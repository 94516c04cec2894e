//! Coordinator driving the beacon, roster and masterserver sync cycles
//!
//! A single `select!` loop owns all mutable state (roster, outbound
//! queue, current masterserver config) and is fed by background tasks
//! over a channel: the socket receiver forwards raw datagrams, config
//! fetches forward their result, and the Ctrl+C watcher requests
//! shutdown. Replies reconcile immediately on receipt; the tick cycle
//! only drives the query broadcast, expiry, flushing and the status
//! report. Failures inside one cycle are logged and never cancel the
//! timers driving future cycles.

use crate::beacon;
use crate::config::Settings;
use crate::display;
use crate::listing_manager::ListingManager;
use crate::masterserver::{MasterClient, RemoteConfig};
use crate::sync_queue::{DirectoryAction, SyncQueue};
use log::{debug, error, info, warn};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};

/// How long the final delisting flush may run before the process gives
/// up and exits anyway
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Messages sent from background tasks to the coordinator loop
#[derive(Debug)]
pub enum ReporterMessage {
    ReplyReceived { payload: Vec<u8>, addr: SocketAddr },
    ConfigFetched(RemoteConfig),
    Shutdown,
}

/// Main coordinator owning the beacon socket and all roster state
pub struct Reporter {
    socket: Arc<UdpSocket>,
    listings: ListingManager,
    queue: SyncQueue,
    master: MasterClient,
    settings: Settings,
    remote: RemoteConfig,

    reporter_tx: mpsc::UnboundedSender<ReporterMessage>,
    reporter_rx: mpsc::UnboundedReceiver<ReporterMessage>,
}

impl Reporter {
    /// Binds the beacon socket and prepares the coordinator
    ///
    /// The timers only start inside [`run`](Self::run), after the socket
    /// is ready to send and receive.
    pub async fn new(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(("0.0.0.0", settings.beacon_port)).await?;
        socket.set_broadcast(true)?;
        info!("Beacon socket listening on UDP port {}", settings.beacon_port);

        let master = MasterClient::new(&settings.masterserver_url)?;
        let (reporter_tx, reporter_rx) = mpsc::unbounded_channel();

        Ok(Reporter {
            socket: Arc::new(socket),
            listings: ListingManager::new(),
            queue: SyncQueue::new(),
            master,
            remote: settings.remote.clone(),
            settings,
            reporter_tx,
            reporter_rx,
        })
    }

    /// Returns a sender for injecting messages from outside the loop,
    /// used by the Ctrl+C watcher to request shutdown
    pub fn message_sender(&self) -> mpsc::UnboundedSender<ReporterMessage> {
        self.reporter_tx.clone()
    }

    /// Spawns the task that forwards every incoming datagram to the loop
    fn spawn_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let reporter_tx = self.reporter_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let payload = buffer[..len].to_vec();
                        if reporter_tx
                            .send(ReporterMessage::ReplyReceived { payload, addr })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns a config fetch whose result comes back as a loop message
    ///
    /// The loop never awaits the HTTP call itself; a slow masterserver
    /// cannot stall the tick cycle.
    fn spawn_config_fetch(&self) {
        let master = self.master.clone();
        let reporter_tx = self.reporter_tx.clone();

        tokio::spawn(async move {
            match master.fetch_config().await {
                Ok(config) => {
                    let _ = reporter_tx.send(ReporterMessage::ConfigFetched(config));
                }
                Err(e) => {
                    warn!("Masterserver config fetch failed, keeping current cadence: {}", e);
                }
            }
        });
    }

    /// Decodes one datagram and applies it to the roster immediately
    fn handle_datagram(&mut self, payload: &[u8], addr: SocketAddr) {
        if let Some(reply) = beacon::decode_reply(payload) {
            if let Some(action) = self.listings.reconcile(reply.listing) {
                self.queue.enqueue(action);
            }
        } else {
            debug!("Ignoring non-reply datagram from {}", addr);
        }
    }

    /// Broadcasts the beacon query to the LAN
    async fn send_query(&self) -> std::io::Result<()> {
        let target = SocketAddrV4::new(Ipv4Addr::BROADCAST, beacon::BEACON_PORT);
        self.socket.send_to(&beacon::QUERY_PACKET, target).await?;
        Ok(())
    }

    /// One tick cycle: query, expire, flush, status report
    async fn run_tick(&mut self) {
        if let Err(e) = self.send_query().await {
            error!("Beacon broadcast failed: {}", e);
        }

        let expired = self.listings.expire(self.settings.expire_ticks);
        self.queue.extend(expired);
        let _ = self.queue.flush(&self.master);

        debug!(
            "{}",
            display::format_roster(&self.remote.service_message, &self.listings.snapshot())
        );
    }

    /// One heartbeat cycle: refresh the remote config and re-announce
    /// the full roster so the masterserver's view cannot drift even if
    /// individual update or delete batches were lost
    fn run_heartbeat(&mut self) {
        self.spawn_config_fetch();

        let roster = self.listings.snapshot();
        if !roster.is_empty() {
            debug!("Re-announcing {} listing(s) to the masterserver", roster.len());
            self.queue.extend(roster.into_iter().map(DirectoryAction::add));
        }
        let _ = self.queue.flush(&self.master);
    }

    /// Applies a fetched masterserver config, rescheduling the heartbeat
    /// timer when the config actually changed
    fn apply_remote_config(&mut self, config: RemoteConfig, heartbeat: &mut Interval) {
        if config == self.remote {
            return;
        }
        if config.heartbeat_interval_ms == 0 {
            warn!("Masterserver sent a zero heartbeat interval, ignoring");
            return;
        }

        info!(
            "Masterserver config changed, heartbeat now every {} ms",
            config.heartbeat_interval_ms
        );
        *heartbeat = Self::cycle_timer(config.heartbeat_interval_ms);
        self.remote = config;
    }

    /// Builds a periodic timer whose first firing is one full period away
    fn cycle_timer(period_ms: u64) -> Interval {
        let period = Duration::from_millis(period_ms);
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer
    }

    /// Main loop coordinating all cycles until shutdown is requested
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_receiver();

        let mut tick = Self::cycle_timer(self.settings.tick_interval_ms);
        let mut heartbeat = Self::cycle_timer(self.remote.heartbeat_interval_ms);

        info!(
            "Reporter started: tick every {} ms, heartbeat every {} ms",
            self.settings.tick_interval_ms, self.remote.heartbeat_interval_ms
        );

        loop {
            tokio::select! {
                message = self.reporter_rx.recv() => {
                    match message {
                        Some(ReporterMessage::ReplyReceived { payload, addr }) => {
                            self.handle_datagram(&payload, addr);
                        }
                        Some(ReporterMessage::ConfigFetched(config)) => {
                            self.apply_remote_config(config, &mut heartbeat);
                        }
                        Some(ReporterMessage::Shutdown) | None => {
                            info!("Reporter shutting down");
                            break;
                        }
                    }
                }

                _ = tick.tick() => {
                    self.run_tick().await;
                }

                _ = heartbeat.tick() => {
                    self.run_heartbeat();
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Delists all servers and gives the final flush a bounded grace
    /// period before the process exits regardless
    async fn shutdown(&mut self) {
        let deletes = self.listings.clear();
        self.queue.extend(deletes);

        if let Some(handle) = self.queue.flush(&self.master) {
            info!("Delisting servers from the masterserver...");
            match timeout(SHUTDOWN_GRACE, handle).await {
                Ok(_) => info!("Delisting complete"),
                Err(_) => warn!(
                    "Final delisting did not finish within {:?}, exiting anyway",
                    SHUTDOWN_GRACE
                ),
            }
        }
    }
}
