//! Source client integration tests
//!
//! Exercises pagination termination, retry/backoff, and auth fail-fast
//! against a simulated provider.

use baseline_ingest::{ApiTennisClient, IngestConfig, IngestError, Resource};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test configuration pointed at the mock server, with fast backoff
fn test_config(server: &MockServer) -> IngestConfig {
    let mut config = IngestConfig::default();
    config.api.base_url = server.uri();
    config.api.api_key = "test-key".to_string();
    config.http.max_attempts = 3;
    config.http.backoff_ms = 1;
    config
}

fn page(records: Vec<Value>, next: Option<u64>) -> Value {
    match next {
        Some(n) => json!({ "result": records, "paging": { "next": n } }),
        None => json!({ "result": records, "paging": { "next": null } }),
    }
}

#[tokio::test]
async fn pagination_yields_union_of_all_pages() {
    let server = MockServer::start().await;

    for (page_no, ids, next) in [
        (1u64, vec![1, 2], Some(2)),
        (2, vec![3, 4], Some(3)),
        (3, vec![5], None),
    ] {
        let records = ids.iter().map(|i| json!({ "id": i })).collect();
        Mock::given(method("GET"))
            .and(path("/players"))
            .and(query_param("page", page_no.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(records, next)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_all(Resource::Players).await.unwrap();

    let ids: Vec<i64> = records
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5], "no duplicates, no truncation");
}

#[tokio::test]
async fn empty_page_does_not_end_the_stream() {
    let server = MockServer::start().await;

    // Page 1 looks empty but still signals a next page; termination must
    // come from the signal, not the empty-looking payload.
    Mock::given(method("GET"))
        .and(path("/rankings"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], Some(2))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rankings"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![json!({ "id": 9 })], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_all(Resource::Rankings).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn recovers_after_two_503s_in_exactly_three_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/players"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![json!({ "id": 1 })], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_all(Resource::Players).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn unbroken_503s_fail_with_transient_fetch_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let err = client.fetch_all(Resource::Players).await.unwrap_err();

    match err {
        IngestError::TransientFetch {
            resource, attempts, ..
        } => {
            assert_eq!(resource, "players");
            assert_eq!(attempts, 3);
        },
        other => panic!("expected TransientFetch, got {other}"),
    }
}

#[tokio::test]
async fn rate_limit_responses_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tournaments"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tournaments"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![json!({ "id": 7 })], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let records = client.fetch_all(Resource::Tournaments).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn non_transient_client_errors_fail_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let err = client.fetch_all(Resource::Players).await.unwrap_err();
    assert!(matches!(err, IngestError::Http(_)), "got {err}");
}

#[tokio::test]
async fn unfollowable_redirect_fails_without_retry() {
    let server = MockServer::start().await;

    // A redirect status with no Location header comes back to the caller
    // as-is; it is neither a success nor retryable.
    Mock::given(method("GET"))
        .and(path("/players"))
        .respond_with(ResponseTemplate::new(303))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiTennisClient::new(&test_config(&server)).unwrap();
    let err = client.fetch_all(Resource::Players).await.unwrap_err();

    match err {
        IngestError::UnexpectedStatus { resource, status } => {
            assert_eq!(resource, "players");
            assert_eq!(status.as_u16(), 303);
        },
        other => panic!("expected UnexpectedStatus, got {other}"),
    }
}

#[tokio::test]
async fn api_key_is_sent_under_configured_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/players"))
        .and(header("x-custom-auth", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.api.key_header = "x-custom-auth".to_string();

    let client = ApiTennisClient::new(&config).unwrap();
    client.fetch_all(Resource::Players).await.unwrap();
}

#[tokio::test]
async fn missing_key_fails_fast_with_no_network_call() {
    let server = MockServer::start().await;

    // No mocks mounted: any request would 404 and fail the test via the
    // strict expectations below.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.api.api_key = String::new();

    let err = ApiTennisClient::new(&config).unwrap_err();
    assert!(matches!(err, IngestError::AuthConfig(_)));
}
