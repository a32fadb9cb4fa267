use orionsim::protocol::{Request, RequestKind, ResponseStatus, ServerMessage};
use orionsim::server::{MissionServer, ServerConfig, SubscriberRegistry};
use orionsim::sim::{MissionSimulator, SimConfig};
use orionsim::telemetry::Snapshot;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::timeout;

const TEST_TICK: Duration = Duration::from_millis(50);
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let sim = MissionSimulator::new(SimConfig {
        seed: 7,
        time_scale: 1.0,
    });
    let server = MissionServer::bind(
        ServerConfig {
            port: 0,
            tick_interval: TEST_TICK,
        },
        sim,
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

async fn next_snapshot(lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>) -> Snapshot {
    loop {
        let line = timeout(RECV_TIMEOUT, lines.next_line())
            .await
            .expect("timed out waiting for snapshot")
            .unwrap()
            .expect("server closed connection");
        if let Ok(ServerMessage::Snapshot(snapshot)) = serde_json::from_str(&line) {
            return snapshot;
        }
    }
}

/// Collect the next few snapshot lines keyed by tick number.
async fn collect_snapshot_lines(
    lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>,
    count: usize,
) -> HashMap<u64, String> {
    let mut collected = HashMap::new();
    while collected.len() < count {
        let line = timeout(RECV_TIMEOUT, lines.next_line())
            .await
            .expect("timed out waiting for snapshot")
            .unwrap()
            .expect("server closed connection");
        if let Ok(ServerMessage::Snapshot(snapshot)) = serde_json::from_str::<ServerMessage>(&line)
        {
            collected.insert(snapshot.tick, line);
        }
    }
    collected
}

async fn send_request(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>,
    request: Request,
) -> orionsim::protocol::QueryResponse {
    let mut encoded = serde_json::to_string(&request).unwrap();
    encoded.push('\n');
    writer.write_all(encoded.as_bytes()).await.unwrap();

    loop {
        let line = timeout(RECV_TIMEOUT, lines.next_line())
            .await
            .expect("timed out waiting for response")
            .unwrap()
            .expect("server closed connection");
        if let Ok(ServerMessage::Response(response)) =
            serde_json::from_str::<ServerMessage>(&line)
        {
            if response.id == request.id {
                return response;
            }
        }
    }
}

#[cfg(test)]
mod streaming_tests {
    use super::*;

    #[tokio::test]
    async fn test_new_subscriber_receives_complete_snapshot() {
        let addr = start_server().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, _writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let snapshot = next_snapshot(&mut lines).await;

        // A freshly connected subscriber gets a full aggregate, never a
        // partial one.
        assert!(snapshot.tick >= 1);
        assert_eq!(snapshot.crew.len(), 4);
        assert!(!snapshot.spacecraft.mission_elapsed_time.is_empty());
        assert!(!snapshot.timeline.events.is_empty());
        assert!(!snapshot.power.batteries.is_empty());
    }

    #[tokio::test]
    async fn test_same_tick_subscribers_see_identical_content() {
        let addr = start_server().await;

        let stream_a = TcpStream::connect(addr).await.unwrap();
        let stream_b = TcpStream::connect(addr).await.unwrap();
        let (reader_a, _writer_a) = stream_a.into_split();
        let (reader_b, _writer_b) = stream_b.into_split();
        let mut lines_a = BufReader::new(reader_a).lines();
        let mut lines_b = BufReader::new(reader_b).lines();

        let from_a = collect_snapshot_lines(&mut lines_a, 8).await;
        let from_b = collect_snapshot_lines(&mut lines_b, 8).await;

        let mut shared = 0;
        for (tick, line) in &from_a {
            if let Some(other) = from_b.get(tick) {
                assert_eq!(line, other, "tick {tick} diverged between subscribers");
                shared += 1;
            }
        }
        assert!(shared > 0, "subscribers never observed a common tick");
    }

    #[tokio::test]
    async fn test_met_non_decreasing_across_stream() {
        let addr = start_server().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, _writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let mut previous = String::new();
        for _ in 0..6 {
            let snapshot = next_snapshot(&mut lines).await;
            assert!(snapshot.spacecraft.mission_elapsed_time >= previous);
            previous = snapshot.spacecraft.mission_elapsed_time;
        }
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_point_queries_and_not_found_conditions() {
        let addr = start_server().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let response = send_request(
            &mut writer,
            &mut lines,
            Request {
                id: 1,
                kind: RequestKind::GetCrewMember { index: 2 },
            },
        )
        .await;
        assert_eq!(response.status, ResponseStatus::Ok);
        let member = response.payload.unwrap();
        assert_eq!(member["name"], "Christina Koch");

        let response = send_request(
            &mut writer,
            &mut lines,
            Request {
                id: 2,
                kind: RequestKind::GetCrewMember { index: 9 },
            },
        )
        .await;
        assert_eq!(response.status, ResponseStatus::NotFound);

        let response = send_request(
            &mut writer,
            &mut lines,
            Request {
                id: 3,
                kind: RequestKind::AcknowledgeAlert { id: 987_654 },
            },
        )
        .await;
        assert_eq!(response.status, ResponseStatus::NotFound);

        let response = send_request(
            &mut writer,
            &mut lines,
            Request {
                id: 4,
                kind: RequestKind::GetAlerts { active_only: true },
            },
        )
        .await;
        assert_eq!(response.status, ResponseStatus::Ok);
    }

    #[tokio::test]
    async fn test_malformed_request_gets_invalid_response_and_stream_survives() {
        let addr = start_server().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"{definitely not json}\n").await.unwrap();

        let mut saw_invalid = false;
        for _ in 0..10 {
            let line = timeout(RECV_TIMEOUT, lines.next_line())
                .await
                .expect("timed out")
                .unwrap()
                .expect("server closed connection");
            if let Ok(ServerMessage::Response(response)) =
                serde_json::from_str::<ServerMessage>(&line)
            {
                assert_eq!(response.status, ResponseStatus::InvalidRequest);
                saw_invalid = true;
                break;
            }
        }
        assert!(saw_invalid);

        // The connection still streams snapshots afterwards.
        let snapshot = next_snapshot(&mut lines).await;
        assert!(snapshot.tick >= 1);
    }

    #[tokio::test]
    async fn test_health_reports_subscriber_count_and_met() {
        let addr = start_server().await;

        // One pure stream subscriber plus the querying connection.
        let passive = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let response = send_request(
            &mut writer,
            &mut lines,
            Request {
                id: 10,
                kind: RequestKind::Health,
            },
        )
        .await;
        assert_eq!(response.status, ResponseStatus::Ok);
        let payload = response.payload.unwrap();
        assert_eq!(payload["status"], "operational");
        assert!(payload["active_subscribers"].as_u64().unwrap() >= 2);
        assert!(payload["mission_elapsed_time"].as_str().unwrap().contains(':'));

        drop(passive);
    }
}

#[cfg(test)]
mod fanout_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_subscriber_is_evicted_without_stalling_peers() {
        let registry = Arc::new(SubscriberRegistry::new());

        let (slow_id, _slow_tx, _slow_rx) = registry.register().await;
        let (fast_id, _fast_tx, mut fast_rx) = registry.register().await;
        assert_eq!(registry.count().await, 2);

        // The slow subscriber never drains; the fast one keeps up. The
        // producer only ever uses non-blocking sends, so the slow consumer
        // falls behind until its buffer fills and it is evicted.
        let mut evicted = Vec::new();
        for round in 0..20 {
            let line: Arc<str> = Arc::from(format!("snapshot {round}\n"));
            evicted.extend(registry.broadcast(line).await);
            let _ = fast_rx.try_recv();
        }

        assert_eq!(evicted, vec![slow_id]);
        assert_eq!(registry.count().await, 1);
        let _ = fast_id;
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let (id, _tx, _rx) = registry.register().await;

        registry.deregister(id).await;
        registry.deregister(id).await;
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_dropped_on_next_broadcast() {
        let registry = SubscriberRegistry::new();
        let (id, tx, rx) = registry.register().await;
        drop(rx);
        drop(tx);

        let evicted = registry.broadcast(Arc::from("snapshot\n")).await;
        assert_eq!(evicted, vec![id]);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnected_client_leaves_registry() {
        let addr = start_server().await;

        let transient = TcpStream::connect(addr).await.unwrap();
        let (reader, transient_writer) = transient.into_split();
        let mut lines = BufReader::new(reader).lines();
        let _ = next_snapshot(&mut lines).await;
        // Close both halves so the server observes the disconnect.
        drop(transient_writer);
        drop(lines);

        // Give the server a moment to observe the disconnect.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        let response = send_request(
            &mut writer,
            &mut lines,
            Request {
                id: 20,
                kind: RequestKind::Health,
            },
        )
        .await;

        assert_eq!(
            response.payload.unwrap()["active_subscribers"].as_u64(),
            Some(1)
        );
    }
}
