use super::*;

fn test_client(base_url: &str) -> VintedClient {
    VintedClient::new(ClientConfig {
        base_url: base_url.to_owned(),
        user_agent: "vinted-test/0.1".to_owned(),
        seed_cookie: None,
        session_cookie_name: "_vinted_fr_session".to_owned(),
        timeout_secs: 5,
    })
    .expect("client builds")
}

#[test]
fn search_url_encodes_query_parameters() {
    let client = test_client("https://www.vinted.co.uk");
    let url = client
        .search_url("levi's 501 & co", SearchOrder::PriceLowToHigh, "GBP")
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://www.vinted.co.uk/api/v2/catalog/items?search_text=levi%27s+501+%26+co&currency=GBP&order=price_low_to_high"
    );
}

#[test]
fn search_url_strips_trailing_slash_from_base() {
    let client = test_client("https://www.vinted.co.uk/");
    let url = client
        .search_url("boots", SearchOrder::NewestFirst, "EUR")
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://www.vinted.co.uk/api/v2/catalog/items?search_text=boots&currency=EUR&order=newest_first"
    );
}

#[test]
fn new_rejects_unparsable_base_url() {
    let result = VintedClient::new(ClientConfig {
        base_url: "not a url".to_owned(),
        user_agent: "ua".to_owned(),
        seed_cookie: None,
        session_cookie_name: "_vinted_fr_session".to_owned(),
        timeout_secs: 5,
    });
    assert!(
        matches!(result, Err(ScraperError::InvalidBaseUrl { .. })),
        "expected InvalidBaseUrl"
    );
}

#[test]
fn session_pair_matches_exact_cookie_name() {
    assert_eq!(
        session_pair(
            "_vinted_fr_session=abc123; path=/; HttpOnly",
            "_vinted_fr_session"
        ),
        Some("_vinted_fr_session=abc123".to_owned())
    );
}

#[test]
fn session_pair_ignores_other_cookies_and_attributes() {
    assert_eq!(session_pair("anon_id=xyz; path=/", "_vinted_fr_session"), None);
    assert_eq!(
        session_pair("other=1; comment=_vinted_fr_session=x", "_vinted_fr_session"),
        None
    );
}

#[test]
fn session_pair_rejects_empty_value() {
    assert_eq!(
        session_pair("_vinted_fr_session=; path=/", "_vinted_fr_session"),
        None
    );
}
