//! Tests for cache freshness under a controlled clock.

use std::sync::Arc;
use std::time::Duration;

use openclaw_bridge::bridge::{ManualClock, ResultCache, DEFAULT_TTL};
use serde_json::json;

#[test]
fn entry_served_until_ttl_then_missed() {
    let clock = Arc::new(ManualClock::new());
    let cache = ResultCache::with_clock(clock.clone());

    cache.put("status", json!({"ok": true}));
    assert!(cache.get("status", DEFAULT_TTL).is_some());

    clock.advance(Duration::from_millis(2999));
    assert!(cache.get("status", DEFAULT_TTL).is_some());

    clock.advance(Duration::from_millis(1));
    assert!(cache.get("status", DEFAULT_TTL).is_none());
}

#[test]
fn concurrent_writers_last_write_wins() {
    let cache = Arc::new(ResultCache::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.put("agents list", json!([i])))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 1);
    let value = cache.get("agents list", DEFAULT_TTL).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}
