use crate::protocol::{
    encode_message, parse_request, HealthReport, QueryResponse, Request, RequestKind,
    ServerMessage, SubsystemKey,
};
use crate::sim::MissionSimulator;
use crate::telemetry::Snapshot;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time;
use tracing::{error, info, warn};

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

// A subscriber that falls this many snapshots behind is evicted rather than
// awaited; individual socket writes are additionally time-boxed.
const SUBSCRIBER_BUFFER: usize = 8;
const WRITE_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Latest-snapshot cell for synchronous point-in-time queries. Written once
/// per tick by the tick loop; queries only ever read it, so no read can
/// trigger a simulation step or observe a partial update.
pub struct SnapshotCache {
    inner: RwLock<Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new(initial: Arc<Snapshot>) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub async fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.inner.read().await)
    }

    pub async fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.inner.write().await = snapshot;
    }
}

/// Concurrently-safe registry of stream subscribers. Each subscriber is a
/// bounded channel; fan-out uses non-blocking sends so a slow or dead
/// consumer is evicted instead of stalling the tick or its peers.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a subscriber. The returned sender is the connection's outbox (a
    /// clone of the registered one); the receiver feeds its writer task. The
    /// first snapshot arrives at the next tick boundary.
    pub async fn register(&self) -> (u64, mpsc::Sender<Arc<str>>, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().await.insert(id, tx.clone());
        (id, tx, rx)
    }

    /// Remove a subscriber. Idempotent; a disconnect and an eviction may
    /// both land here.
    pub async fn deregister(&self, id: u64) {
        self.subscribers.lock().await.remove(&id);
    }

    pub async fn count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Fan one serialized snapshot line out to every subscriber. Returns the
    /// ids evicted this pass (channel full or closed).
    pub async fn broadcast(&self, line: Arc<str>) -> Vec<u64> {
        let mut subscribers = self.subscribers.lock().await;
        let mut evicted = Vec::new();
        for (id, tx) in subscribers.iter() {
            if tx.try_send(Arc::clone(&line)).is_err() {
                evicted.push(*id);
            }
        }
        for id in &evicted {
            subscribers.remove(id);
            warn!(subscriber = *id, "evicting slow or closed subscriber");
        }
        evicted
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The bound server: a tick task producing one snapshot per interval and an
/// accept loop feeding per-connection reader/writer tasks.
pub struct MissionServer {
    listener: TcpListener,
    sim: Arc<Mutex<MissionSimulator>>,
    cache: Arc<SnapshotCache>,
    registry: Arc<SubscriberRegistry>,
    tick_interval: Duration,
}

impl MissionServer {
    pub async fn bind(config: ServerConfig, sim: MissionSimulator) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
        let sim = Arc::new(Mutex::new(sim));
        // Prime the cache so queries never race the first tick; subscribers
        // still only ever receive tick-boundary broadcasts.
        let initial = { sim.lock().await.tick() };

        Ok(Self {
            listener,
            sim,
            cache: Arc::new(SnapshotCache::new(initial)),
            registry: Arc::new(SubscriberRegistry::new()),
            tick_interval: config.tick_interval,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let addr = self.listener.local_addr()?;
        info!(%addr, "telemetry server listening");

        tokio::spawn(tick_loop(
            Arc::clone(&self.sim),
            Arc::clone(&self.cache),
            Arc::clone(&self.registry),
            self.tick_interval,
        ));

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "client connected");
                    let sim = Arc::clone(&self.sim);
                    let cache = Arc::clone(&self.cache);
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        if let Err(err) = handle_client(stream, sim, cache, registry).await {
                            warn!(%peer, error = %err, "client connection error");
                        }
                        info!(%peer, "client disconnected");
                    });
                }
                Err(err) => {
                    error!(error = %err, "failed to accept connection");
                }
            }
        }
    }
}

/// The fixed-cadence producer: advance the simulation, publish the snapshot
/// for point queries, serialize it exactly once, and fan it out. Subscriber
/// count never affects the cadence.
async fn tick_loop(
    sim: Arc<Mutex<MissionSimulator>>,
    cache: Arc<SnapshotCache>,
    registry: Arc<SubscriberRegistry>,
    interval: Duration,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let snapshot = { sim.lock().await.tick() };
        cache.publish(Arc::clone(&snapshot)).await;

        match encode_message(&ServerMessage::Snapshot((*snapshot).clone())) {
            Ok(mut line) => {
                line.push('\n');
                registry.broadcast(Arc::from(line)).await;
            }
            Err(err) => {
                error!(error = %err, "failed to serialize snapshot");
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    sim: Arc<Mutex<MissionSimulator>>,
    cache: Arc<SnapshotCache>,
    registry: Arc<SubscriberRegistry>,
) -> std::io::Result<()> {
    let (reader, writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let (id, outbox, rx) = registry.register().await;
    let writer_registry = Arc::clone(&registry);
    let writer_task = tokio::spawn(write_loop(writer, rx, id, writer_registry));

    // Request loop. Responses share the outbox with pushed snapshots so the
    // socket has a single writer. Disconnects and read errors both fall
    // through to the same idempotent deregistration.
    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match parse_request(trimmed) {
            Ok(request) => handle_request(request, &sim, &cache, &registry).await,
            Err(err) => QueryResponse::invalid(0, err.to_string()),
        };

        let message = ServerMessage::Response(response);
        let encoded = match encode_message(&message) {
            Ok(mut encoded) => {
                encoded.push('\n');
                encoded
            }
            Err(err) => {
                error!(error = %err, "failed to serialize response");
                continue;
            }
        };
        if outbox.send(Arc::from(encoded)).await.is_err() {
            break Ok(());
        }
    };

    registry.deregister(id).await;
    writer_task.abort();
    result
}

/// Single writer per connection. Every write is time-boxed; a stall evicts
/// the subscriber and closes the transport rather than backing up the tick.
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Arc<str>>,
    id: u64,
    registry: Arc<SubscriberRegistry>,
) {
    while let Some(line) = rx.recv().await {
        match time::timeout(WRITE_TIMEOUT, writer.write_all(line.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(subscriber = id, error = %err, "subscriber write failed");
                break;
            }
            Err(_) => {
                warn!(subscriber = id, "subscriber write exceeded budget");
                break;
            }
        }
    }
    registry.deregister(id).await;
    let _ = writer.shutdown().await;
}

async fn handle_request(
    request: Request,
    sim: &Arc<Mutex<MissionSimulator>>,
    cache: &SnapshotCache,
    registry: &SubscriberRegistry,
) -> QueryResponse {
    let id = request.id;
    match request.kind {
        RequestKind::GetSnapshot => payload_response(id, cache.latest().await.as_ref()),
        RequestKind::GetSubsystem { system } => {
            let snapshot = cache.latest().await;
            match system {
                SubsystemKey::Spacecraft => payload_response(id, &snapshot.spacecraft),
                SubsystemKey::Crew => payload_response(id, &snapshot.crew),
                SubsystemKey::Eclss => payload_response(id, &snapshot.eclss),
                SubsystemKey::Power => payload_response(id, &snapshot.power),
                SubsystemKey::Propulsion => payload_response(id, &snapshot.propulsion),
                SubsystemKey::Communications => payload_response(id, &snapshot.communications),
                SubsystemKey::Timeline => payload_response(id, &snapshot.timeline),
            }
        }
        RequestKind::GetCrewMember { index } => {
            let snapshot = cache.latest().await;
            match snapshot.crew.get(index) {
                Some(member) => payload_response(id, member),
                None => QueryResponse::not_found(
                    id,
                    format!("crew member index {index} out of range (0-3)"),
                ),
            }
        }
        RequestKind::GetAlerts { active_only } => {
            let snapshot = cache.latest().await;
            let alerts: Vec<_> = snapshot
                .alerts
                .iter()
                .filter(|alert| !active_only || !alert.acknowledged)
                .collect();
            payload_response(id, &alerts)
        }
        RequestKind::AcknowledgeAlert { id: alert_id } => {
            match sim.lock().await.acknowledge_alert(alert_id) {
                Ok(()) => payload_response(id, &serde_json::json!({ "acknowledged": alert_id })),
                Err(err) => QueryResponse::not_found(id, err.to_string()),
            }
        }
        RequestKind::Health => {
            let snapshot = cache.latest().await;
            let report = HealthReport {
                status: "operational".to_string(),
                active_subscribers: registry.count().await,
                mission_elapsed_time: snapshot.spacecraft.mission_elapsed_time.clone(),
            };
            payload_response(id, &report)
        }
    }
}

fn payload_response<T: serde::Serialize>(id: u32, payload: &T) -> QueryResponse {
    match serde_json::to_value(payload) {
        Ok(value) => QueryResponse::ok(id, value),
        Err(err) => QueryResponse::error(id, err.to_string()),
    }
}
