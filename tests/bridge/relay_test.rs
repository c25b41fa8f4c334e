//! Tests for the follow-mode log relay.

use std::time::Duration;

use futures_util::StreamExt;
use openclaw_bridge::bridge::{RelayDriver, RelayEvent, RelayState, DEFAULT_IDLE_TIMEOUT};
use tokio::io::AsyncWriteExt;

fn line(text: &str) -> RelayEvent {
    RelayEvent::Line(text.to_string())
}

#[tokio::test(start_paused = true)]
async fn idle_gap_yields_one_keepalive_between_lines() {
    let (mut writer, reader) = tokio::io::duplex(256);
    tokio::spawn(async move {
        writer.write_all(b"{\"a\":1}\n").await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;
        writer.write_all(b"{\"b\":2}\n").await.unwrap();
    });

    let events: Vec<RelayEvent> = RelayDriver::new(reader, None, DEFAULT_IDLE_TIMEOUT)
        .into_stream()
        .collect()
        .await;

    assert_eq!(
        events,
        vec![line("{\"a\":1}"), RelayEvent::Keepalive, line("{\"b\":2}")]
    );
}

#[tokio::test(start_paused = true)]
async fn keepalive_keeps_streaming_state() {
    let (writer, reader) = tokio::io::duplex(64);
    let mut driver = RelayDriver::new(reader, None, DEFAULT_IDLE_TIMEOUT);

    assert_eq!(driver.next_event().await, Some(RelayEvent::Keepalive));
    assert_eq!(driver.state(), RelayState::Streaming);
    assert_eq!(driver.next_event().await, Some(RelayEvent::Keepalive));
    assert_eq!(driver.state(), RelayState::Streaming);

    drop(writer);
    assert_eq!(driver.next_event().await, None);
    assert_eq!(driver.state(), RelayState::Closed);
}

#[tokio::test]
async fn mock_reader_eof_closes_relay() {
    let reader = tokio_test::io::Builder::new()
        .read(b"{\"level\":\"info\"}\n")
        .build();
    let events: Vec<RelayEvent> = RelayDriver::new(reader, None, DEFAULT_IDLE_TIMEOUT)
        .into_stream()
        .collect()
        .await;
    assert_eq!(events, vec![line("{\"level\":\"info\"}")]);
}

#[cfg(unix)]
mod with_child {
    use super::*;
    use crate::bridge::support::{process_exists, sh};
    use openclaw_bridge::bridge::LogRelay;

    #[tokio::test]
    async fn child_output_is_relayed_until_exit() {
        let events: Vec<RelayEvent> = LogRelay::new(sh("echo '{\"a\":1}'; echo; echo '{\"b\":2}'"))
            .start()
            .collect()
            .await;
        assert_eq!(events, vec![line("{\"a\":1}"), line("{\"b\":2}")]);
    }

    #[tokio::test]
    async fn dropping_stream_kills_child() {
        let mut stream = LogRelay::new(sh("echo $$; exec sleep 30")).start();

        let pid: i32 = match stream.next().await {
            Some(RelayEvent::Line(pid)) => pid.parse().unwrap(),
            other => panic!("Expected pid line, got {other:?}"),
        };
        assert!(process_exists(pid));

        drop(stream);

        let deadline = tokio::time::Instant::now() + DEFAULT_IDLE_TIMEOUT;
        while process_exists(pid) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "child {pid} survived disconnect"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn stderr_flood_does_not_stall_stdout() {
        let mut stream = LogRelay::new(sh("head -c 200000 /dev/zero >&2; echo '{\"a\":1}'; exec sleep 30"))
            .idle_timeout(Duration::from_millis(500))
            .start();

        let first = tokio::time::timeout(Duration::from_secs(3), stream.next())
            .await
            .unwrap();
        assert_eq!(first, Some(line("{\"a\":1}")));
    }

    #[tokio::test]
    async fn progress_output_is_split_on_carriage_return() {
        let events: Vec<RelayEvent> = LogRelay::new(sh("printf 'progress 10%%\\rprogress 20%%\\n'"))
            .start()
            .collect()
            .await;
        assert_eq!(events, vec![line("progress 10%"), line("progress 20%")]);
        assert!(events.iter().all(|e| !e.payload().contains('\r')));
    }

    #[tokio::test]
    async fn missing_binary_yields_single_error() {
        let events: Vec<RelayEvent> =
            LogRelay::new(vec!["/nonexistent/openclaw".to_string(), "logs".to_string()])
                .start()
                .collect()
                .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RelayEvent::Error(_)));
    }
}
