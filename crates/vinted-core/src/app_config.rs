use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub source_base_url: String,
    pub source_currency: String,
    /// Cookie header sent when requesting a session credential.
    pub source_seed_cookie: Option<String>,
    pub source_session_cookie_name: String,
    pub source_user_agent: String,
    pub source_request_timeout_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_secs: u64,
    pub persist_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    pub max_concurrent_refreshes: usize,
    pub shutdown_grace_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("source_base_url", &self.source_base_url)
            .field("source_currency", &self.source_currency)
            .field(
                "source_seed_cookie",
                &self.source_seed_cookie.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "source_session_cookie_name",
                &self.source_session_cookie_name,
            )
            .field("source_user_agent", &self.source_user_agent)
            .field(
                "source_request_timeout_secs",
                &self.source_request_timeout_secs,
            )
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_backoff_base_secs", &self.fetch_backoff_base_secs)
            .field("persist_timeout_secs", &self.persist_timeout_secs)
            .field("refresh_timeout_secs", &self.refresh_timeout_secs)
            .field("max_concurrent_refreshes", &self.max_concurrent_refreshes)
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .finish()
    }
}
