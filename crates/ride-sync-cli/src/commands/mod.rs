//! CLI command implementations.

mod lifecycle;
mod messages;
mod watch;

pub use lifecycle::{cancel, complete, return_to_requests};
pub use messages::{list_messages, send_message};
pub use watch::{watch, ReconnectPolicy};

use crate::output::OutputFormat;
use anyhow::Result;
use realtime_channel::RealtimeConfig;
use ride_store::RideStoreClient;
use ride_sync::{SyncConfig, ToastConfig};
use sync_config_and_utils::Config;

/// Everything a command needs from the command line and config file.
pub struct Context {
    config: Config,
    access_token: Option<String>,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: Config, access_token: Option<String>, format: OutputFormat) -> Self {
        Self {
            config,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            format,
        }
    }

    /// The user access token; store writes need one.
    pub fn require_token(&self) -> Result<&str> {
        self.access_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!("An access token is required (use --access-token or SUPABASE_ACCESS_TOKEN)")
        })
    }

    /// Bearer for reads: the user token when present, otherwise the
    /// publishable key.
    pub fn bearer(&self) -> &str {
        self.access_token
            .as_deref()
            .unwrap_or(&self.config.supabase_publishable_key)
    }

    pub fn store(&self) -> Result<RideStoreClient> {
        let url = self.config.supabase_url()?;
        Ok(RideStoreClient::new(
            url.as_str(),
            self.config.supabase_publishable_key.clone(),
        )
        .with_tables(
            self.config.tables.rides.clone(),
            self.config.tables.messages.clone(),
        ))
    }

    pub fn realtime_config(&self) -> Result<RealtimeConfig> {
        let url = self.config.supabase_url()?;
        let mut config =
            RealtimeConfig::new(url.as_str(), self.config.supabase_publishable_key.clone());
        config.heartbeat_interval = self.config.realtime.heartbeat_interval();
        config.join_timeout = self.config.realtime.join_timeout();
        if let Some(token) = &self.access_token {
            config = config.with_access_token(token.clone());
        }
        Ok(config)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            schema: self.config.tables.schema.clone(),
            rides_table: self.config.tables.rides.clone(),
            messages_table: self.config.tables.messages.clone(),
            ..SyncConfig::default()
        }
    }

    pub fn toast_config(&self) -> ToastConfig {
        ToastConfig {
            limit: self.config.notifications.limit,
            remove_delay: self.config.notifications.remove_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn context(token: Option<&str>) -> Context {
        let mut config = Config::default();
        config.supabase_url = "https://abc.supabase.co".to_string();
        config.supabase_publishable_key = "pk".to_string();
        config.tables.rides = "trips".to_string();
        config.realtime.join_timeout_secs = 4;
        config.notifications.limit = 2;
        Context::new(config, token.map(String::from), OutputFormat::Text)
    }

    #[test]
    fn test_token_required_for_writes() {
        assert!(context(None).require_token().is_err());
        assert!(context(Some("  ")).require_token().is_err());
        assert_eq!(context(Some("jwt")).require_token().unwrap(), "jwt");
    }

    #[test]
    fn test_bearer_falls_back_to_publishable_key() {
        assert_eq!(context(None).bearer(), "pk");
        assert_eq!(context(Some("jwt")).bearer(), "jwt");
    }

    #[test]
    fn test_derived_configs() {
        let ctx = context(Some("jwt"));

        let realtime = ctx.realtime_config().unwrap();
        assert_eq!(realtime.join_timeout, Duration::from_secs(4));
        assert_eq!(realtime.access_token.as_deref(), Some("jwt"));

        let sync = ctx.sync_config();
        assert_eq!(sync.rides_table, "trips");
        assert_eq!(sync.ride_id_column, "id");
        assert_eq!(sync.message_ride_column, "ride_id");

        assert_eq!(ctx.toast_config().limit, 2);
    }
}
