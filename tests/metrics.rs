// tests/metrics.rs
#![cfg(feature = "strict-metrics")]

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use cyber_briefing::ingest::feed::parse_feed;
use cyber_briefing::metrics::Metrics;

const VENDOR_RSS: &[u8] = include_bytes!("fixtures/vendor_rss.xml");

#[tokio::test]
async fn metrics_endpoint_contains_ingest_series() {
    let m = Metrics::init().expect("recorder installs once per test binary");
    let app: Router = m.router();

    let items = parse_feed(VENDOR_RSS, "Vendor", Utc::now());
    assert!(!items.is_empty());

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in ["ingest_items_total", "feed_parse_ms"] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}
