//! Log store behaviour against a real SQLite database.

mod support;

use chrono::Duration;
use crmbridge_domain::{LogFilter, LogLevel, SortOrder};
use serde_json::{json, Value};
use support::Harness;

#[tokio::test(flavor = "multi_thread")]
async fn disabled_levels_write_nothing() {
    let h = Harness::new();

    h.logs.debug("debug is off by default", None).await;
    h.logs.set_level_enabled(LogLevel::Info, false).await.unwrap();
    h.logs.info("info switched off", None).await;

    assert_eq!(h.logs.count_logs(&LogFilter::default()).await.unwrap(), 0);
    assert!(h.sink.events().is_empty());

    h.logs.set_level_enabled(LogLevel::Debug, true).await.unwrap();
    h.logs.debug("debug switched on", None).await;
    assert_eq!(h.logs.count_logs(&LogFilter::default()).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn error_entries_are_persisted_and_mirrored_once() {
    let h = Harness::new();

    h.logs.error("remote write failed", Some(json!({"object": "Contact"}))).await;
    h.logs.warning("slow response", None).await;

    let errors = h.logs.get_logs(&LogFilter::default().level(LogLevel::Error)).await.unwrap();
    assert_eq!(errors.len(), 1);

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, LogLevel::Error);
    assert_eq!(events[0].1, "remote write failed");
    assert_eq!(events[0].2, json!({"object": "Contact"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn retention_keeps_the_most_recent_entries() {
    let h = Harness::new();
    h.logs.set_max_entries(3).await.unwrap();

    for i in 0..5 {
        h.logs.info(&format!("entry {i}"), None).await;
        h.clock.advance(Duration::seconds(1));
    }

    let remaining = h.logs.get_logs(&LogFilter::default()).await.unwrap();
    let messages: Vec<_> = remaining.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["entry 4", "entry 3", "entry 2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn limit_returns_newest_first() {
    let h = Harness::new();
    for i in 0..5 {
        h.logs.info(&format!("entry {i}"), None).await;
        h.clock.advance(Duration::seconds(1));
    }

    let page = h.logs.get_logs(&LogFilter::default().limit(2)).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].message, "entry 4");
    assert_eq!(page[1].message, "entry 3");
    assert!(page[0].timestamp > page[1].timestamp);

    let oldest = h
        .logs
        .get_logs(&LogFilter::default().limit(2).offset(1).order(SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(oldest[0].message, "entry 1");
}

#[tokio::test(flavor = "multi_thread")]
async fn context_round_trips() {
    let h = Harness::new();
    h.logs.info("with context", Some(json!({"a": 1}))).await;
    h.logs.info("without context", None).await;
    h.logs.info("scalar context", Some(json!(5))).await;

    let entries = h.logs.get_logs(&LogFilter::default().order(SortOrder::Asc)).await.unwrap();
    assert_eq!(entries[0].context, json!({"a": 1}));
    assert_eq!(entries[1].context, json!({}));
    assert_eq!(entries[2].context, json!({"value": 5}));
}

#[tokio::test(flavor = "multi_thread")]
async fn helpers_format_messages_and_tag_triggers() {
    let h = Harness::new();

    h.logs.log_sync_attempt(17, "create", false, Some(json!({"reason": "timeout"}))).await;
    h.logs.log_api_call("/sobjects/Contact", "POST", 201, Some(json!({"id": "003"})), None).await;
    h.logs.log_api_call("/sobjects/Contact", "PATCH", 400, None, None).await;
    h.logs.log_auth_event("authenticate", true, None).await;

    let sync = h.logs.get_logs(&LogFilter::default().post_id(17)).await.unwrap();
    assert_eq!(sync.len(), 1);
    assert_eq!(sync[0].message, "Sync create failed for post 17");
    assert_eq!(sync[0].level, LogLevel::Error);
    assert_eq!(sync[0].trigger_type.as_deref(), Some("sync"));

    let api = h
        .logs
        .get_logs(&LogFilter::default().trigger_type("api_call").order(SortOrder::Asc))
        .await
        .unwrap();
    assert_eq!(api.len(), 2);
    assert_eq!(api[0].level, LogLevel::Info);
    assert_eq!(api[0].message, "API POST /sobjects/Contact returned 201");
    assert_eq!(api[0].context["status_code"], json!(201));
    assert_eq!(api[1].level, LogLevel::Error);

    let auth = h.logs.get_logs(&LogFilter::default().trigger_type("auth")).await.unwrap();
    assert_eq!(auth[0].message, "Authentication authenticate succeeded");

    let errors_for_api = h
        .logs
        .count_logs(&LogFilter::default().trigger_type("api_call").level(LogLevel::Error))
        .await
        .unwrap();
    assert_eq!(errors_for_api, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn stats_cover_levels_and_time_windows() {
    let h = Harness::new();

    h.logs.error("old error", None).await;
    h.clock.advance(Duration::days(3));
    h.logs.error("recent error", None).await;
    h.logs.info("recent info", None).await;
    h.clock.advance(Duration::days(5));
    h.logs.warning("fresh warning", None).await;

    let stats = h.logs.get_log_stats().await.unwrap();
    assert_eq!(stats.by_level.get(&LogLevel::Error), Some(&2));
    assert_eq!(stats.by_level.get(&LogLevel::Info), Some(&1));
    assert_eq!(stats.by_level.get(&LogLevel::Debug), None);
    assert_eq!(stats.recent_24h, 1);
    assert_eq!(stats.errors_7d, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn clear_by_level_and_entirely() {
    let h = Harness::new();
    h.logs.error("e", None).await;
    h.logs.info("i1", None).await;
    h.logs.info("i2", None).await;

    assert_eq!(h.logs.clear_logs(Some(LogLevel::Info)).await.unwrap(), 2);
    assert_eq!(h.logs.count_logs(&LogFilter::default()).await.unwrap(), 1);
    assert_eq!(h.logs.clear_logs(None).await.unwrap(), 1);
    assert_eq!(h.logs.count_logs(&LogFilter::default()).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn export_formats() {
    let h = Harness::new();
    h.logs.log(LogLevel::Info, "first, with comma", Some(json!({"k": "v"})), Some(5), Some("sync")).await;

    let csv = h.logs.export_logs("csv", &LogFilter::default()).await.unwrap().unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,timestamp,level,message,post_id,trigger_type,context"));
    let row = lines.next().unwrap();
    assert!(row.contains("\"first, with comma\""));
    assert!(row.contains(",5,sync,"));
    assert!(row.ends_with("\"{\"\"k\"\":\"\"v\"\"}\""));

    let json_export = h.logs.export_logs("JSON", &LogFilter::default()).await.unwrap().unwrap();
    let parsed: Value = serde_json::from_str(&json_export).unwrap();
    assert_eq!(parsed[0]["message"], "first, with comma");
    assert_eq!(parsed[0]["context"], json!({"k": "v"}));

    assert_eq!(h.logs.export_logs("xml", &LogFilter::default()).await.unwrap(), None);
}
