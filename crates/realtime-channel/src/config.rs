//! Realtime client configuration.

use crate::error::RealtimeResult;
use std::time::Duration;
use url::Url;

/// Protocol version sent in the websocket query string.
const PROTOCOL_VSN: &str = "1.0.0";

/// Realtime client configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Supabase project URL (e.g., https://xyz.supabase.co).
    pub supabase_url: String,
    /// Publishable (anon) key, sent as `apikey`.
    pub api_key: String,
    /// User access token forwarded on join so RLS applies.
    pub access_token: Option<String>,
    /// Heartbeat interval.
    pub heartbeat_interval: Duration,
    /// How long to wait for a join reply before reporting a timeout.
    pub join_timeout: Duration,
}

impl RealtimeConfig {
    /// Create a config with default timings.
    pub fn new(supabase_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            api_key: api_key.into(),
            access_token: None,
            heartbeat_interval: Duration::from_secs(25),
            join_timeout: Duration::from_secs(10),
        }
    }

    /// Set the user access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build the realtime websocket URL from the project URL.
    pub fn websocket_url(&self) -> RealtimeResult<Url> {
        let mut url = Url::parse(self.supabase_url.trim_end_matches('/'))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // set_scheme only fails for special/non-special switches, which
        // http(s) -> ws(s) is not.
        let _ = url.set_scheme(scheme);
        url.set_path("/realtime/v1/websocket");
        url.query_pairs_mut()
            .clear()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", PROTOCOL_VSN);
        Ok(url)
    }
}
