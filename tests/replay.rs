//! End-to-end: packets in through the daemon, JSON records out on disk

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use tokio::sync::mpsc;

use netsentry::config::Config;
use netsentry::core::{DetectionRecord, MacAddr, PacketRecord, Verdict};
use netsentry::ml::{ModelArtifact, SCHEMA_WIDTH};
use netsentry::Daemon;

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

/// Config rooted in a temp dir, with a model that scores everything ~0
fn test_config(dir: &Path) -> Config {
    let model_path = dir.join("model.json");
    let artifact = ModelArtifact {
        input_width: SCHEMA_WIDTH,
        weights: vec![0.0; SCHEMA_WIDTH],
        bias: -20.0,
        label: Some("anomaly".to_string()),
        trained_at: None,
    };
    std::fs::write(&model_path, serde_json::to_string(&artifact).unwrap()).unwrap();

    let mut config = Config::default();
    config.detection.model_path = model_path;
    config.sink.detection_log = dir.join("detections.log");
    config.sink.metrics_log = dir.join("metrics.log");
    config
}

fn read_records(path: &Path) -> Vec<DetectionRecord> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn udp_flood_replay_lands_one_alert_in_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let daemon = Daemon::new(&config).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let run = tokio::spawn(daemon.run(rx));

    for _ in 0..101 {
        tx.send(PacketRecord::udp(ip(5), ip(1), 9999).with_payload_len(64))
            .await
            .unwrap();
    }
    drop(tx);
    run.await.unwrap().unwrap();

    let records = read_records(&config.sink.detection_log);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].verdict, Verdict::Anomaly);
    assert_eq!(records[0].signatures, vec!["UDP-Flood".to_string()]);

    // 101 scored packets exceed the minimum, so the final flush wrote
    // a metrics summary too
    let metrics = std::fs::read_to_string(&config.sink.metrics_log).unwrap();
    assert_eq!(metrics.lines().count(), 1);
}

#[tokio::test]
async fn arp_mac_change_is_flagged_and_first_sighting_is_not() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let daemon = Daemon::new(&config).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let run = tokio::spawn(daemon.run(rx));

    let mac_a = MacAddr([0xaa; 6]);
    let mac_b = MacAddr([0xbb; 6]);
    tx.send(PacketRecord::arp_reply(ip(1), mac_a, ip(2))).await.unwrap();
    tx.send(PacketRecord::arp_reply(ip(1), mac_a, ip(2))).await.unwrap();
    tx.send(PacketRecord::arp_reply(ip(1), mac_b, ip(2))).await.unwrap();
    drop(tx);
    run.await.unwrap().unwrap();

    let records = read_records(&config.sink.detection_log);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].signatures, vec!["ARP-Spoofing".to_string()]);
}

#[tokio::test]
async fn unwritable_detection_log_aborts_the_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    // Regular file where the log's parent directory should be, so every
    // append fails and the retries run dry
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    config.sink.detection_log = blocker.join("detections.log");
    config.sink.retry_backoff_ms = 1;

    let daemon = Daemon::new(&config).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let run = tokio::spawn(daemon.run(rx));

    // One flood alert that can never reach disk
    for _ in 0..101 {
        tx.send(PacketRecord::udp(ip(5), ip(1), 9999).with_payload_len(64))
            .await
            .unwrap();
    }
    drop(tx);

    assert!(run.await.unwrap().is_err());
}

#[tokio::test]
async fn audit_mode_logs_benign_traffic_too() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.sink.log_all = true;

    let daemon = Daemon::new(&config).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let run = tokio::spawn(daemon.run(rx));

    for _ in 0..3 {
        tx.send(PacketRecord::udp(ip(5), ip(1), 8080).with_payload_len(64))
            .await
            .unwrap();
    }
    drop(tx);
    run.await.unwrap().unwrap();

    let records = read_records(&config.sink.detection_log);
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.verdict == Verdict::Normal));
}
