//! Table and column names the session subscribes to.

use realtime_channel::{ChangeKind, ChannelSpec, RowFilter};
use ride_types::RideId;

/// Where rides and messages live in the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Database schema.
    pub schema: String,
    /// Rides table.
    pub rides_table: String,
    /// Messages table.
    pub messages_table: String,
    /// Primary key column of the rides table.
    pub ride_id_column: String,
    /// Column on the messages table referencing the ride.
    pub message_ride_column: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            rides_table: "rides".to_string(),
            messages_table: "messages".to_string(),
            ride_id_column: "id".to_string(),
            message_ride_column: "ride_id".to_string(),
        }
    }
}

impl SyncConfig {
    /// Updates to the one ride row.
    pub(crate) fn ride_channel(&self, ride_id: &RideId, generation: u64) -> ChannelSpec {
        ChannelSpec {
            name: format!("ride-{}-g{}", ride_id, generation),
            event: ChangeKind::Update,
            schema: self.schema.clone(),
            table: self.rides_table.clone(),
            filter: RowFilter::eq(&self.ride_id_column, ride_id.as_str()),
        }
    }

    /// Inserts of messages belonging to the ride.
    pub(crate) fn message_channel(&self, ride_id: &RideId, generation: u64) -> ChannelSpec {
        ChannelSpec {
            name: format!("ride-messages-{}-g{}", ride_id, generation),
            event: ChangeKind::Insert,
            schema: self.schema.clone(),
            table: self.messages_table.clone(),
            filter: RowFilter::eq(&self.message_ride_column, ride_id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_specs() {
        let config = SyncConfig::default();
        let ride_id = RideId::parse("ride-1").unwrap();

        let ride = config.ride_channel(&ride_id, 3);
        assert_eq!(ride.name, "ride-ride-1-g3");
        assert_eq!(ride.event, ChangeKind::Update);
        assert_eq!(ride.table, "rides");
        assert_eq!(ride.filter.to_string(), "id=eq.ride-1");

        let messages = config.message_channel(&ride_id, 3);
        assert_eq!(messages.name, "ride-messages-ride-1-g3");
        assert_eq!(messages.event, ChangeKind::Insert);
        assert_eq!(messages.table, "messages");
        assert_eq!(messages.filter.to_string(), "ride_id=eq.ride-1");
    }
}
