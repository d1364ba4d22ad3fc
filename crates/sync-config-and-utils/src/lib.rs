//! Configuration, paths, and logging setup for ride sync binaries.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, NotificationSettings, RealtimeSettings, TableSettings, DEFAULT_LOG_LEVEL,
    DEFAULT_SUPABASE_PUBLISHABLE_KEY, DEFAULT_SUPABASE_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
