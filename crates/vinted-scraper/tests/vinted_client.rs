//! Integration tests for `VintedClient`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no real
//! network traffic is made. The server plays both the site root (session
//! cookie) and the catalog search endpoint.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vinted_core::SearchOrder;
use vinted_scraper::{ClientConfig, ScraperError, VintedClient};

const SESSION: &str = "_vinted_fr_session=test-session-token";

fn test_client(server: &MockServer, seed_cookie: Option<&str>) -> VintedClient {
    VintedClient::new(ClientConfig {
        base_url: server.uri(),
        user_agent: "Mozilla/5.0 (vinted-test)".to_owned(),
        seed_cookie: seed_cookie.map(str::to_owned),
        session_cookie_name: "_vinted_fr_session".to_owned(),
        timeout_secs: 5,
    })
    .expect("failed to build test VintedClient")
}

async fn mount_session_cookie(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "anon_id=abc; path=/")
                .append_header("set-cookie", format!("{SESSION}; path=/; HttpOnly")),
        )
        .mount(server)
        .await;
}

fn fixture() -> serde_json::Value {
    serde_json::from_str(include_str!("fixtures/catalog_items.json")).expect("fixture parses")
}

// ---------------------------------------------------------------------------
// Session credential
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_session_cookie_picks_named_cookie_among_many() {
    let server = MockServer::start().await;
    mount_session_cookie(&server).await;

    let cookie = test_client(&server, None)
        .fetch_session_cookie()
        .await
        .expect("cookie");
    assert_eq!(cookie, SESSION);
}

#[tokio::test]
async fn fetch_session_cookie_sends_seed_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "anon_id=seeded"))
        .respond_with(
            ResponseTemplate::new(200).append_header("set-cookie", format!("{SESSION}; path=/")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cookie = test_client(&server, Some("anon_id=seeded"))
        .fetch_session_cookie()
        .await
        .expect("cookie");
    assert_eq!(cookie, SESSION);
}

#[tokio::test]
async fn missing_session_cookie_is_a_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).append_header("set-cookie", "anon_id=abc"))
        .mount(&server)
        .await;

    let result = test_client(&server, None)
        .search("levis", SearchOrder::NewestFirst, "GBP")
        .await;
    assert!(
        matches!(result, Err(ScraperError::Credential { .. })),
        "expected Credential, got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_sends_query_cookie_and_accept_headers() {
    let server = MockServer::start().await;
    mount_session_cookie(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .and(query_param("search_text", "levi's 501"))
        .and(query_param("currency", "GBP"))
        .and(query_param("order", "price_high_to_low"))
        .and(header("cookie", SESSION))
        .and(header("accept", "application/json, text/plain, */*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&server)
        .await;

    let response = test_client(&server, None)
        .search("levi's 501", SearchOrder::PriceHighToLow, "GBP")
        .await
        .expect("search succeeds");

    assert_eq!(response.items.len(), 2);
    assert_eq!(response.code, Some(0));
    assert_eq!(
        response.pagination.as_ref().map(|p| p.total_entries),
        Some(960)
    );
}

#[tokio::test]
async fn search_items_returns_normalized_collection() {
    let server = MockServer::start().await;
    mount_session_cookie(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .mount(&server)
        .await;

    let items = test_client(&server, None)
        .search_items("levis", SearchOrder::NewestFirst, "GBP")
        .await
        .expect("search succeeds");

    assert_eq!(items.len(), 2);
    assert_eq!(items.items[0].title, "Levi's 501 jeans");
    assert!(items.items[0].discount.is_none());
}

#[tokio::test]
async fn non_success_status_is_unexpected_status() {
    let server = MockServer::start().await;
    mount_session_cookie(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = test_client(&server, None)
        .search("levis", SearchOrder::NewestFirst, "GBP")
        .await;
    match result {
        Err(ScraperError::UnexpectedStatus { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_session_cookie(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "not-a-number", "title": 5}]
        })))
        .mount(&server)
        .await;

    let result = test_client(&server, None)
        .search("levis", SearchOrder::NewestFirst, "GBP")
        .await;
    assert!(
        matches!(result, Err(ScraperError::Decode { .. })),
        "expected Decode, got: {result:?}"
    );
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Port 1 is reserved (tcpmux) and closed on test hosts.
    let uri = "http://127.0.0.1:1".to_owned();

    let client = VintedClient::new(ClientConfig {
        base_url: uri,
        user_agent: "ua".to_owned(),
        seed_cookie: None,
        session_cookie_name: "_vinted_fr_session".to_owned(),
        timeout_secs: 2,
    })
    .expect("client");

    let result = client.search("levis", SearchOrder::NewestFirst, "GBP").await;
    assert!(
        matches!(result, Err(ScraperError::Transport(_))),
        "expected Transport, got: {result:?}"
    );
}
