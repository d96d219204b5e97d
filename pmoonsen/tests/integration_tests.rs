//! Integration tests for pmoonsen

use chrono::TimeZone;
use pmoonsen::OnsenClient;
use pmoprogram::{jst, CalendarDate, Error, ManualClock, ProgramSource, Station, StreamType};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_catalog_json() -> serde_json::Value {
    json!([
        {
            "id": 17,
            "directory_name": "toshitai",
            "title": "セブン-イレブン presents 佐倉としたい大西",
            "contents": [
                {
                    "id": 11134,
                    "title": "第334回",
                    "program_id": 17,
                    "premium": false,
                    "free": true,
                    "delivery_date": "8/23",
                    "streaming_url": "https://onsen.test/toshitai220823xv3m-334.mp4/playlist.m3u8",
                    "expiring": false
                },
                {
                    "id": 11080,
                    "title": "第333回",
                    "program_id": 17,
                    "premium": true,
                    "free": false,
                    "delivery_date": "8/16",
                    "streaming_url": null,
                    "expiring": false
                }
            ]
        },
        {
            "id": 99,
            "title": "年末特番",
            "contents": [
                {
                    "id": 12000,
                    "title": "前編",
                    "delivery_date": "12/27",
                    "streaming_url": "https://onsen.test/special/playlist.m3u8"
                }
            ]
        }
    ])
}

fn client_for(server: &MockServer, y: i32, m: u32, d: u32) -> OnsenClient {
    let now = jst::offset().with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
    OnsenClient::builder()
        .base_url(server.uri())
        .clock(Arc::new(ManualClock::new(now)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_fetch_schedule_returns_one_draft_per_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/web_api/programs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_catalog_json()))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 2023, 1, 3);
    // Not date-scoped: any date returns the same catalog
    let drafts = client
        .fetch_schedule(CalendarDate::new(2030, 1, 1).unwrap())
        .await
        .unwrap();

    assert_eq!(drafts.len(), 3);
    assert!(drafts.iter().all(|d| d.station == Station::Onsen));
    assert!(drafts.iter().all(|d| d.stream_type == StreamType::Ondemand));

    let ids: Vec<i64> = drafts.iter().map(|d| d.source_id).collect();
    assert_eq!(ids, vec![11134, 11080, 12000]);

    // 8/23 seen on 2023-01-03 belongs to 2022
    assert_eq!(drafts[0].start.format("%Y-%m-%d").to_string(), "2022-08-23");
    assert_eq!(drafts[0].episode.as_deref(), Some("第334回"));
    assert!(drafts[0].playlist_url.is_some());
    assert_eq!(drafts[1].playlist_url, None);
    assert_eq!(drafts[2].start.format("%Y-%m-%d").to_string(), "2022-12-27");
}

#[tokio::test]
async fn test_fetch_schedule_non_success_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/web_api/programs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 2022, 8, 25);
    let err = client
        .fetch_schedule(CalendarDate::new(2022, 8, 25).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NonSuccessStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_fetch_schedule_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/web_api/programs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 2022, 8, 25);
    let err = client
        .fetch_schedule(CalendarDate::new(2022, 8, 25).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_fetch_schedule_transport_error() {
    let client = OnsenClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let err = client
        .fetch_schedule(CalendarDate::new(2022, 8, 25).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
}
