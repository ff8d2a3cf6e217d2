// tests/registry_store.rs
use std::fs;
use std::path::Path;
use std::sync::Arc;

use cyber_briefing::ingest::fetch::StaticFetcher;
use cyber_briefing::registry::{Registry, SourceRecord, TopicRecord};
use cyber_briefing::store::JsonFileStore;
use cyber_briefing::RegistryError;

const CERT_ATOM: &str = include_str!("fixtures/cert_atom.xml");

fn file_registry(dir: &Path, fetcher: StaticFetcher) -> Registry {
    Registry::new(
        Arc::new(JsonFileStore::<Vec<TopicRecord>>::new(dir.join("topics.json"))),
        Arc::new(JsonFileStore::<Vec<SourceRecord>>::new(dir.join("news_sources.json"))),
        Arc::new(fetcher),
    )
}

#[tokio::test]
async fn add_source_round_trips_through_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = StaticFetcher::new().with_body("https://cert.test/atom", CERT_ATOM);
    let r = file_registry(dir.path(), fetcher);

    r.add_source("CERT", "https://cert.test/atom").await.unwrap();

    // a fresh registry over the same files sees the record
    let again = file_registry(dir.path(), StaticFetcher::new());
    let sources = again.sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "CERT");
    assert_eq!(sources[0].url, "https://cert.test/atom");
    assert!(!sources[0].alerts_enabled());

    let raw = fs::read_to_string(dir.path().join("news_sources.json")).unwrap();
    assert!(!raw.contains("alerts_enabled"));
}

#[tokio::test]
async fn edit_topic_99_is_invalid_index_and_file_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("topics.json"),
        r#"[{"topic": "ransomware"}, {"topic": "phishing"}]"#,
    )
    .unwrap();
    let before = fs::read_to_string(dir.path().join("topics.json")).unwrap();
    let r = file_registry(dir.path(), StaticFetcher::new());

    let err = r.edit_topic(99, "malware").await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidIndex { index: 99, len: 2 }));
    assert_eq!(err.to_string(), "invalid index 99 (list has 2 entries)");

    let after = fs::read_to_string(dir.path().join("topics.json")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn legacy_documents_without_flag_read_as_disabled() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("news_sources.json"),
        r#"[
  {"name": "A", "url": "https://a.test/rss"},
  {"name": "B", "url": "https://b.test/rss", "alerts_enabled": true}
]"#,
    )
    .unwrap();
    let r = file_registry(dir.path(), StaticFetcher::new());
    let s = r.sources();
    assert!(!s[0].alerts_enabled());
    assert!(s[1].alerts_enabled());

    assert!(r.toggle_alerts(0).await.unwrap());
    let reread = file_registry(dir.path(), StaticFetcher::new()).sources();
    assert_eq!(reread[0].alerts_enabled, Some(true));
}

#[tokio::test]
async fn unreadable_documents_degrade_to_empty_lists() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("topics.json"), "{{ nope").unwrap();
    let r = file_registry(dir.path(), StaticFetcher::new());
    assert!(r.topics().is_empty());
    assert!(r.sources().is_empty());
}
