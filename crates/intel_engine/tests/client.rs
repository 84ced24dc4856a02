use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use intel_engine::{ApiClient, ApiSettings, FailureKind, ItemQuery, ReqwestApiClient};

fn client_for(server: &MockServer) -> ReqwestApiClient {
    let settings = ApiSettings {
        base_url: Url::parse(&server.uri()).unwrap(),
        ..ApiSettings::default()
    };
    ReqwestApiClient::new(settings).unwrap()
}

fn source_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "tg_url": format!("https://t.me/channel{id}"),
        "title": null,
        "status": "pending",
        "created_at": "2024-05-01T08:00:00+00:00"
    })
}

#[tokio::test]
async fn lists_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            source_json(2),
            source_json(1)
        ])))
        .mount(&server)
        .await;

    let sources = client_for(&server).list_sources().await.unwrap();
    let ids: Vec<i64> = sources.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(sources[0].address, "https://t.me/channel2");
}

#[tokio::test]
async fn create_posts_address_and_decodes_created_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/channels"))
        .and(body_json(json!({ "tg_url": "@durov" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(source_json(9)))
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server).create_source("@durov").await.unwrap();
    assert_eq!(created.id, 9);
    assert_eq!(created.status, "pending");
}

#[tokio::test]
async fn create_rejection_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/channels"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "Invalid Telegram username" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).create_source("@x").await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.detail().as_deref(), Some("Invalid Telegram username"));
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/channels/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_source(4).await.unwrap();
}

#[tokio::test]
async fn trigger_refresh_returns_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/channels/4/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enqueued": true,
            "resolved": false,
            "channel_id": 4
        })))
        .mount(&server)
        .await;

    let receipt = client_for(&server).trigger_refresh(4).await.unwrap();
    assert!(receipt.enqueued);
    assert!(!receipt.resolved);
    assert_eq!(receipt.source_id, 4);
}

#[tokio::test]
async fn item_page_sends_paging_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels/3/posts"))
        .and(query_param("query", "launch day"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": 31,
                "channel_id": 3,
                "tg_message_id": 120,
                "posted_at": "2024-05-02T10:00:00+00:00",
                "text": "launch day",
                "views": 1500,
                "forwards": null,
                "replies": 4,
                "reactions": null
            }],
            "page": 2,
            "page_size": 20,
            "total": 21
        })))
        .mount(&server)
        .await;

    let query = ItemQuery {
        query: Some("launch day".to_string()),
        page: 2,
        page_size: 20,
    };
    let page = client_for(&server).list_items(3, &query).await.unwrap();
    assert_eq!(page.total, 21);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].sequence, 120);
    assert_eq!(page.items[0].engagement(), 1504);
}

#[tokio::test]
async fn item_page_omits_empty_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels/3/posts"))
        .and(query_param_is_missing("query"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [], "page": 1, "page_size": 20, "total": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ItemQuery {
        query: None,
        page: 1,
        page_size: 20,
    };
    let page = client_for(&server).list_items(3, &query).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn unknown_source_items_fail_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels/99/posts"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Channel not found" })))
        .mount(&server)
        .await;

    let query = ItemQuery {
        query: None,
        page: 1,
        page_size: 20,
    };
    let err = client_for(&server).list_items(99, &query).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn latest_job_decodes_null_and_present_but_fails_on_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels/1/jobs/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/channels/2/jobs/latest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/channels/3/jobs/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "status": "completed",
            "started_at": "2024-05-02T10:00:00+00:00",
            "finished_at": "2024-05-02T10:00:05+00:00",
            "error": null,
            "stats": { "inserted": 7 }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.latest_job(1).await.unwrap(), None);
    let err = client.latest_job(2).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    let job = client.latest_job(3).await.unwrap().unwrap();
    assert_eq!(job.id, 12);
    assert_eq!(job.stats.and_then(|s| s.inserted), Some(7));
}

#[tokio::test]
async fn summarize_decodes_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/posts/31/summarize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "post_id": 31, "summary": "short", "cached": true
        })))
        .mount(&server)
        .await;

    let summary = client_for(&server).summarize(31).await.unwrap();
    assert_eq!(summary.item_id, 31);
    assert_eq!(summary.summary, "short");
    assert!(summary.cached);
}

#[tokio::test]
async fn malformed_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_sources().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let settings = ApiSettings {
        base_url: Url::parse(&server.uri()).unwrap(),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    };
    let err = ReqwestApiClient::new(settings)
        .unwrap()
        .list_sources()
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[          ]"))
        .mount(&server)
        .await;

    let settings = ApiSettings {
        base_url: Url::parse(&server.uri()).unwrap(),
        max_body_bytes: 5,
        ..ApiSettings::default()
    };
    let err = ReqwestApiClient::new(settings)
        .unwrap()
        .list_sources()
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 5,
            actual: Some(12)
        }
    );
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/intel/api/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ApiSettings {
        base_url: Url::parse(&format!("{}/intel/", server.uri())).unwrap(),
        ..ApiSettings::default()
    };
    let sources = ReqwestApiClient::new(settings)
        .unwrap()
        .list_sources()
        .await
        .unwrap();
    assert!(sources.is_empty());
}
