//! Tests for the gateway query facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openclaw_bridge::bridge::{
    BridgeError, BridgeSettings, CommandBuilder, CommandRunner, GatewayBridge, HostPlatform,
    ManualClock, ResultCache,
};
use serde_json::json;

/// Counts invocations and always prints `{"ok":true}`.
#[derive(Default)]
struct CountingRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl CommandRunner for CountingRunner {
    async fn run(
        &self,
        _label: &str,
        _argv: &[String],
        _timeout: Duration,
    ) -> Result<String, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(r#"{"ok":true}"#.to_string())
    }
}

fn counting_bridge() -> (Arc<CountingRunner>, Arc<ManualClock>, GatewayBridge) {
    let runner = Arc::new(CountingRunner::default());
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(ResultCache::with_clock(clock.clone()));
    let bridge = GatewayBridge::with_runner(
        CommandBuilder::new("openclaw", HostPlatform::Native),
        runner.clone(),
        cache,
    );
    (runner, clock, bridge)
}

#[tokio::test]
async fn status_is_cached_for_ttl() {
    let (runner, clock, bridge) = counting_bridge();

    // t = 0: spawn
    assert_eq!(bridge.status().await.unwrap(), json!({"ok": true}));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

    // t = 1.5: cache hit
    clock.advance(Duration::from_millis(1500));
    assert_eq!(bridge.status().await.unwrap(), json!({"ok": true}));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

    // t = 3.1: expired, spawn again
    clock.advance(Duration::from_millis(1600));
    assert_eq!(bridge.status().await.unwrap(), json!({"ok": true}));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn gateway_health_uses_longer_ttl() {
    let (runner, clock, bridge) = counting_bridge();

    bridge.gateway_health().await.unwrap();
    clock.advance(Duration::from_secs(4));
    bridge.gateway_health().await.unwrap();
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_millis(1100));
    bridge.gateway_health().await.unwrap();
    assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn distinct_commands_do_not_share_entries() {
    let (runner, _clock, bridge) = counting_bridge();

    bridge.status().await.unwrap();
    bridge.health().await.unwrap();
    bridge.models_list().await.unwrap();
    bridge.models_status().await.unwrap();
    bridge.sessions().await.unwrap();
    assert_eq!(runner.calls.load(Ordering::SeqCst), 5);

    bridge.status().await.unwrap();
    assert_eq!(runner.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn custom_settings_apply() {
    let (runner, clock, bridge) = counting_bridge();
    let bridge = bridge.with_settings(BridgeSettings {
        default_ttl: Duration::from_secs(10),
        ..BridgeSettings::default()
    });

    bridge.agents().await.unwrap();
    clock.advance(Duration::from_secs(9));
    bridge.agents().await.unwrap();
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
}

#[cfg(unix)]
mod with_fake_cli {
    use super::*;
    use crate::bridge::support::fake_cli;

    const SCRIPT: &str = r#"
case "$1" in
  status) echo '{"ok":true}' ;;
  health) echo 'not json' ;;
  agents) echo '[{"id":"main"}]' ;;
  skills) echo 'skills backend offline' >&2; exit 2 ;;
  channels) exit 1 ;;
  sessions) echo 'gateway closed' >&2 ;;
  logs) printf '{"msg":"a"}\n{"msg":"b"}\n' ;;
  *) exit 1 ;;
esac
"#;

    fn real_bridge(platform: HostPlatform) -> (tempfile::TempDir, GatewayBridge) {
        let (dir, path) = fake_cli(SCRIPT);
        let builder = CommandBuilder::new(path.to_string_lossy().into_owned(), platform);
        let bridge = GatewayBridge::new(builder, Arc::new(ResultCache::new()));
        (dir, bridge)
    }

    #[tokio::test]
    async fn required_query_decodes() {
        let (_dir, bridge) = real_bridge(HostPlatform::Native);
        assert_eq!(bridge.status().await.unwrap(), json!({"ok": true}));
        assert_eq!(bridge.agents().await.unwrap(), json!([{"id": "main"}]));
    }

    #[tokio::test]
    async fn foreign_platform_runs_through_shell() {
        let wrapper = vec!["sh".to_string(), "-c".to_string()];
        let (_dir, bridge) = real_bridge(HostPlatform::Foreign { wrapper });
        assert_eq!(bridge.status().await.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn best_effort_skills_failure_is_empty() {
        let (_dir, bridge) = real_bridge(HostPlatform::Native);
        assert_eq!(bridge.skills().await, json!([]));
        assert_eq!(bridge.channels().await, json!([]));
    }

    #[tokio::test]
    async fn invalid_json_is_unavailable() {
        let (_dir, bridge) = real_bridge(HostPlatform::Native);
        let err = bridge.health().await.unwrap_err();
        assert!(matches!(err.cause(), BridgeError::Decode { .. }));
        assert!(err.to_string().starts_with("OpenClaw unreachable"));
    }

    #[tokio::test]
    async fn empty_output_surfaces_stderr() {
        let (_dir, bridge) = real_bridge(HostPlatform::Native);
        let err = bridge.sessions().await.unwrap_err();
        match err.cause() {
            BridgeError::EmptyOutput { command, detail } => {
                assert!(command.contains("sessions"));
                assert_eq!(detail, "gateway closed");
            }
            other => panic!("Expected EmptyOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_stays_out_of_errors() {
        let (_dir, path) = fake_cli("exit 0");
        let builder = CommandBuilder::new(path.to_string_lossy().into_owned(), HostPlatform::Native)
            .token("s3cret-token");
        let bridge = GatewayBridge::new(builder, Arc::new(ResultCache::new()));

        let err = bridge.status().await.unwrap_err();
        assert_eq!(err.to_string(), "OpenClaw unreachable: openclaw status: empty output");

        let (_dir, path) = fake_cli("sleep 5");
        let builder = CommandBuilder::new(path.to_string_lossy().into_owned(), HostPlatform::Native)
            .token("s3cret-token");
        let bridge = GatewayBridge::new(builder, Arc::new(ResultCache::new()))
            .with_settings(BridgeSettings {
                logs_timeout: Duration::from_millis(200),
                ..BridgeSettings::default()
            });
        let err = bridge.recent_logs(3).await.unwrap_err();
        assert!(err.cause().is_timeout());
        assert!(!err.to_string().contains("s3cret-token"), "{err}");
        assert!(err.to_string().contains("openclaw logs --limit 3"));
    }

    #[tokio::test]
    async fn recent_logs_returns_raw_text() {
        let (_dir, bridge) = real_bridge(HostPlatform::Native);
        let raw = bridge.recent_logs(2).await.unwrap();
        assert_eq!(raw, "{\"msg\":\"a\"}\n{\"msg\":\"b\"}");
    }

    #[tokio::test]
    async fn missing_cli_is_unavailable() {
        let bridge = GatewayBridge::new(
            CommandBuilder::new("/nonexistent/openclaw", HostPlatform::Native),
            Arc::new(ResultCache::new()),
        );
        let err = bridge.status().await.unwrap_err();
        assert!(matches!(err.cause(), BridgeError::Spawn { .. }));
        assert_eq!(bridge.skills().await, json!([]));
    }
}
