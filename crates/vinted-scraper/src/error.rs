use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("could not obtain session credential from {url}: {reason}")]
    Credential { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("response decode error for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ScraperError {
    /// Returns the HTTP status for [`ScraperError::UnexpectedStatus`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` for failures worth retrying: transport errors, HTTP 429 and 5xx.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> ScraperError {
        ScraperError::UnexpectedStatus {
            status,
            url: "https://www.vinted.co.uk/api/v2/catalog/items".to_owned(),
        }
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
    }

    #[test]
    fn client_errors_and_credential_failures_are_not_transient() {
        assert!(!status(400).is_transient());
        assert!(!status(403).is_transient());
        assert!(!status(404).is_transient());
        let credential = ScraperError::Credential {
            url: "https://www.vinted.co.uk".to_owned(),
            reason: "no session cookie".to_owned(),
        };
        assert!(!credential.is_transient());
        assert_eq!(credential.status(), None);
    }
}
