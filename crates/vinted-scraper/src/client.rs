//! HTTP client for the marketplace catalog search endpoint.

use std::time::Duration;

use reqwest::header::{ACCEPT, COOKIE, SET_COOKIE};
use reqwest::Client;
use vinted_core::{AppConfig, ItemCollection, SearchOrder};

use crate::error::ScraperError;
use crate::normalize::normalize_response;
use crate::types::VintedSearchResponse;

const SEARCH_PATH: &str = "/api/v2/catalog/items";
const SEARCH_ACCEPT: &str = "application/json, text/plain, */*";

/// Connection settings for [`VintedClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site origin, e.g. `https://www.vinted.co.uk`.
    pub base_url: String,
    pub user_agent: String,
    /// Sent as the `Cookie` header when requesting a session credential.
    pub seed_cookie: Option<String>,
    /// Name of the `Set-Cookie` entry that carries the session.
    pub session_cookie_name: String,
    pub timeout_secs: u64,
}

impl ClientConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.source_base_url.clone(),
            user_agent: config.source_user_agent.clone(),
            seed_cookie: config.source_seed_cookie.clone(),
            session_cookie_name: config.source_session_cookie_name.clone(),
            timeout_secs: config.source_request_timeout_secs,
        }
    }
}

/// Client for one marketplace locale.
///
/// Every call to [`VintedClient::search`] obtains a fresh session cookie and
/// issues exactly one search request. Nothing is retried here.
pub struct VintedClient {
    client: Client,
    base_url: String,
    seed_cookie: Option<String>,
    session_cookie_name: String,
}

impl VintedClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`ScraperError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ScraperError> {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        reqwest::Url::parse(&base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            base_url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url,
            seed_cookie: config.seed_cookie,
            session_cookie_name: config.session_cookie_name,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests the site root and returns the session cookie as a
    /// `name=value` pair suitable for a `Cookie` header.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Credential`] — no `Set-Cookie` entry with the
    ///   configured name, or it has an empty value.
    /// - [`ScraperError::Transport`] — network or TLS failure.
    pub async fn fetch_session_cookie(&self) -> Result<String, ScraperError> {
        let mut request = self.client.get(&self.base_url);
        if let Some(seed) = &self.seed_cookie {
            request = request.header(COOKIE, seed);
        }

        let response = request.send().await?;
        let status = response.status();

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|raw| session_pair(raw, &self.session_cookie_name));

        cookie.ok_or_else(|| ScraperError::Credential {
            url: self.base_url.clone(),
            reason: format!(
                "no non-empty {} cookie in response (HTTP {})",
                self.session_cookie_name,
                status.as_u16()
            ),
        })
    }

    /// Issues one catalog search and returns the raw response.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Credential`] — session cookie could not be obtained.
    /// - [`ScraperError::Transport`] — network or TLS failure.
    /// - [`ScraperError::UnexpectedStatus`] — any non-2xx status.
    /// - [`ScraperError::Decode`] — body is not the expected JSON shape.
    pub async fn search(
        &self,
        topic: &str,
        order: SearchOrder,
        currency: &str,
    ) -> Result<VintedSearchResponse, ScraperError> {
        let cookie = self.fetch_session_cookie().await?;
        let url = self.search_url(topic, order, currency)?;

        tracing::debug!(topic, %order, currency, "issuing catalog search");

        let response = self
            .client
            .get(url.clone())
            .header(COOKIE, cookie)
            .header(ACCEPT, SEARCH_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<VintedSearchResponse>(&body).map_err(|e| ScraperError::Decode {
            context: format!("catalog search for \"{topic}\""),
            source: e,
        })
    }

    /// [`VintedClient::search`] followed by normalization.
    ///
    /// # Errors
    ///
    /// Same as [`VintedClient::search`].
    pub async fn search_items(
        &self,
        topic: &str,
        order: SearchOrder,
        currency: &str,
    ) -> Result<ItemCollection, ScraperError> {
        let response = self.search(topic, order, currency).await?;
        Ok(normalize_response(response, currency))
    }

    fn search_url(
        &self,
        topic: &str,
        order: SearchOrder,
        currency: &str,
    ) -> Result<reqwest::Url, ScraperError> {
        let mut url = reqwest::Url::parse(&format!("{}{SEARCH_PATH}", self.base_url)).map_err(
            |e| ScraperError::InvalidBaseUrl {
                base_url: self.base_url.clone(),
                reason: e.to_string(),
            },
        )?;

        url.query_pairs_mut()
            .append_pair("search_text", topic)
            .append_pair("currency", currency)
            .append_pair("order", order.as_str());

        Ok(url)
    }
}

/// Extracts `name=value` from one `Set-Cookie` header value when its cookie
/// name matches `name` and the value is non-empty.
fn session_pair(set_cookie: &str, name: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (key, value) = pair.split_once('=')?;
    (key.trim() == name && !value.trim().is_empty()).then(|| pair.to_owned())
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
