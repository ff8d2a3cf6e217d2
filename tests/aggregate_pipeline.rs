// tests/aggregate_pipeline.rs
//
// End-to-end merge over canned upstreams: two healthy feeds, one feed that
// times out, the news API behind its cache and one topic search per topic.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use cyber_briefing::ingest::cache::{ApiCacheGate, CacheRecord};
use cyber_briefing::ingest::fetch::StaticFetcher;
use cyber_briefing::ingest::providers::news_api::{NewsApiResponse, StaticNewsSearch};
use cyber_briefing::ingest::Aggregator;
use cyber_briefing::registry::{Registry, SourceRecord, TopicRecord};
use cyber_briefing::store::MemoryStore;

const VENDOR_RSS: &str = include_str!("fixtures/vendor_rss.xml");
const CERT_ATOM: &str = include_str!("fixtures/cert_atom.xml");
const SEARCH_RSS: &str = include_str!("fixtures/topic_search_ransomware.xml");
const NEWSAPI_OK: &str = include_str!("fixtures/newsapi_ok.json");

const SEARCH_BASE: &str = "https://search.test/rss";
const RANSOMWARE_SEARCH: &str = "https://search.test/rss?q=ransomware&hl=en-US&gl=US&ceid=US%3Aen";
const PHISHING_SEARCH: &str = "https://search.test/rss?q=phishing&hl=en-US&gl=US&ceid=US%3Aen";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

fn source(name: &str, url: &str) -> SourceRecord {
    SourceRecord {
        name: name.to_string(),
        url: url.to_string(),
        alerts_enabled: None,
    }
}

struct Fixture {
    aggregator: Aggregator,
    search: Arc<StaticNewsSearch>,
}

fn fixture() -> Fixture {
    let topics = vec![
        TopicRecord { topic: "ransomware".into() },
        TopicRecord { topic: "phishing".into() },
    ];
    let sources = vec![
        source("Vendor", "https://vendor.test/rss"),
        source("Slow", "https://slow.test/rss"),
        source("CERT", "https://cert.test/atom"),
    ];
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_body("https://vendor.test/rss", VENDOR_RSS)
            .with_failure("https://slow.test/rss", "operation timed out")
            .with_body("https://cert.test/atom", CERT_ATOM)
            .with_body(RANSOMWARE_SEARCH, SEARCH_RSS)
            .with_body(PHISHING_SEARCH, "<rss><channel></channel></rss>"),
    );
    let registry = Arc::new(Registry::new(
        Arc::new(MemoryStore::with(topics)),
        Arc::new(MemoryStore::with(sources)),
        fetcher.clone(),
    ));

    let resp: NewsApiResponse = serde_json::from_str(NEWSAPI_OK).unwrap();
    let search = Arc::new(StaticNewsSearch::answering(Ok(resp)));
    let gate = Arc::new(ApiCacheGate::new(
        Arc::new(MemoryStore::<CacheRecord>::new()),
        search.clone(),
    ));

    Fixture {
        aggregator: Aggregator::new(registry, fetcher, gate, SEARCH_BASE),
        search,
    }
}

#[tokio::test]
async fn failing_feed_removes_nothing_else() {
    let f = fixture();
    let merged = f.aggregator.merged_news(now()).await;

    let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Undated advisory",
            "New ransomware strain targets hospitals",
            "Critical zero-day in VPN appliances",
            "Phishing campaign impersonates tax authority",
            "City council systems offline after attack - Local Paper",
            "Patch Tuesday preview & what to expect",
            "Phishing kits now bypass MFA",
            "Chip maker reports quarterly results",
            "Guidance on phishing-resistant MFA",
        ]
    );
    assert!(merged.iter().all(|i| i.source_name != "Slow"));
}

#[tokio::test]
async fn items_carry_source_and_topic() {
    let f = fixture();
    let merged = f.aggregator.merged_news(now()).await;
    let find = |title: &str| merged.iter().find(|i| i.title == title).unwrap();

    let hospital = find("New ransomware strain targets hospitals");
    assert_eq!((hospital.source_name.as_str(), hospital.topic.as_str()), ("Vendor", "ransomware"));

    let tax = find("Phishing campaign impersonates tax authority");
    assert_eq!((tax.source_name.as_str(), tax.topic.as_str()), ("NewsAPI", "phishing"));

    let council = find("City council systems offline after attack - Local Paper");
    assert_eq!((council.source_name.as_str(), council.topic.as_str()), ("Google News", "ransomware"));

    let vpn = find("Critical zero-day in VPN appliances");
    assert_eq!(vpn.topic, "General");
}

#[tokio::test]
async fn merged_list_is_newest_first_and_fresh() {
    let f = fixture();
    let merged = f.aggregator.merged_news(now()).await;
    assert!(merged
        .windows(2)
        .all(|w| w[0].published_at >= w[1].published_at));
    assert!(merged
        .iter()
        .all(|i| now() - i.published_at < Duration::hours(24)));
}

#[tokio::test]
async fn news_api_is_called_once_per_ttl() {
    let f = fixture();
    let first = f.aggregator.merged_news(now()).await;
    let second = f
        .aggregator
        .merged_news(now() + Duration::minutes(30))
        .await;
    assert_eq!(f.search.calls(), 1);
    assert_eq!(first.len(), second.len());

    f.aggregator
        .merged_news(now() + Duration::minutes(61))
        .await;
    assert_eq!(f.search.calls(), 2);
}

#[tokio::test]
async fn topic_search_view_is_per_topic() {
    let f = fixture();
    let by_topic = f.aggregator.topic_search_by_topic(now()).await;
    assert_eq!(by_topic.len(), 2);
    assert_eq!(by_topic[0].0, "ransomware");
    assert_eq!(by_topic[0].1.len(), 1);
    assert_eq!(by_topic[1].0, "phishing");
    assert!(by_topic[1].1.is_empty());
}
