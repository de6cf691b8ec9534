//! End-to-end tests: feed socket to vessel directory.

use std::sync::Arc;
use std::time::Duration;

use ais_tracker::{
    ChannelRegistry, ChannelState, ChannelStats, Config, Dispatcher, StateCell, ThinningPolicy,
    VesselDirectory,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

const POSITION: &str = r#"{"msgId":1,"mmsi":257123450,"lat":60.391,"lon":5.322,"sog":10.0,"heading":91,"second":30,"navStatus":0}"#;
const STATIC: &str =
    r#"{"msgId":5,"mmsi":257123450,"name":"TESTSHIP","callsign":"LA1234","shipType":60}"#;

/// Poll `check` until it holds or the deadline passes.
async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test]
async fn test_channel_feeds_directory() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"# feed banner\n").await.unwrap();
        socket
            .write_all(format!("{}\n{}\n", POSITION, STATIC).as_bytes())
            .await
            .unwrap();
        // Hold the connection open until the test is done
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let config: Config = toml::from_str(&format!(
        r#"
        channels = ["local"]
        [properties]
        "channel.local.host" = "127.0.0.1"
        "channel.local.port" = {}
        "channel.local.tag" = "harbour"
        "#,
        port
    ))
    .unwrap();
    let mut registry = ChannelRegistry::from_config(&config);

    assert!(registry.activate("local").await.unwrap());

    let directory = Arc::clone(registry.directory());
    assert!(
        wait_for(|| directory
            .get(257_123_450)
            .is_some_and(|v| v.read().name() == Some("TESTSHIP")))
        .await
    );

    let channel = registry.get("local").unwrap();
    assert_eq!(channel.state(), ChannelState::Running);

    let vessel = directory.get(257_123_450).unwrap().snapshot();
    assert_eq!(vessel.type_text(), "Passenger");
    assert!(vessel.has_tag("AIS"));
    assert!(vessel.has_tag("AIS.passenger"));
    assert!(vessel.has_tag("harbour"));
    assert_eq!(vessel.source_channel(), Some("local"));
    assert_eq!(vessel.trail().len(), 1);
    assert_eq!(vessel.speed(), 2);
    assert_eq!(vessel.course(), 91);

    let statuses = registry.statuses();
    assert_eq!(statuses[0].messages, 2);
    assert_eq!(statuses[0].vessels, 1);

    registry.deactivate_all().await;
    assert_eq!(registry.get("local").unwrap().state(), ChannelState::Off);

    server.abort();
}

#[tokio::test]
async fn test_channel_stays_starting_without_reports() {
    // Nothing listens here, so the feed keeps retrying in the background
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut registry = ChannelRegistry::from_config(&Config::default());
    registry.add_channel("quiet");
    let settings = ais_tracker::ChannelSettings {
        host: "127.0.0.1".to_string(),
        port,
        tag: None,
    };
    assert!(registry.update_settings("quiet", &settings));

    assert!(registry.activate("quiet").await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.get("quiet").unwrap().state(), ChannelState::Starting);
    assert!(registry.directory().is_empty());

    registry.deactivate_all().await;
    assert_eq!(registry.get("quiet").unwrap().state(), ChannelState::Off);
}

#[test]
fn test_concurrent_channels_create_one_vessel() {
    let directory = Arc::new(VesselDirectory::default());
    let policy = Arc::new(ThinningPolicy::default());

    let stats: Vec<Arc<ChannelStats>> = (0..8).map(|_| Arc::new(ChannelStats::new())).collect();

    std::thread::scope(|scope| {
        for (i, channel_stats) in stats.iter().enumerate() {
            let dispatcher = Dispatcher::new(
                format!("ch{}", i),
                Arc::clone(&directory),
                policy.clone(),
                Arc::clone(channel_stats),
                Arc::new(StateCell::new(ChannelState::Starting)),
            );
            scope.spawn(move || {
                for _ in 0..50 {
                    dispatcher.handle_line(POSITION);
                    dispatcher.handle_line(STATIC);
                }
            });
        }
    });

    assert_eq!(directory.len(), 1);
    let created: u64 = stats.iter().map(|s| s.vessels()).sum();
    assert_eq!(created, 1);
    let messages: u64 = stats.iter().map(|s| s.messages()).sum();
    assert_eq!(messages, 8 * 100);

    let vessel = directory.get(257_123_450).unwrap().snapshot();
    assert_eq!(vessel.name(), Some("TESTSHIP"));
    assert!(!vessel.trail().is_empty());
}
