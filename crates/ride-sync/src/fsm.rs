//! Connection status state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Disconnected   │ (initial) ◄──────────────────────────┐
//! └────────┬────────┘                                      │
//!          │ Open                                          │
//!          ▼                                               │
//! ┌─────────────────┐  ChannelError / TimedOut / Close     │
//! │   Connecting    │ ─────────────────────────────────────┤
//! └────────┬────────┘                                      │
//!          │ Subscribed                                    │
//!          ▼                                               │
//! ┌─────────────────┐  ChannelError / TimedOut / Close     │
//! │    Connected    │ ─────────────────────────────────────┘
//! └─────────────────┘
//! ```
//!
//! Inputs with no edge from the current state are rejected by `consume` and
//! leave the state unchanged. A late `Subscribed` after a failure is one.

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::fmt;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub connection_machine(Disconnected)

    Disconnected => {
        Open => Connecting,
        Close => Disconnected
    },
    Connecting => {
        Subscribed => Connected,
        ChannelError => Disconnected,
        TimedOut => Disconnected,
        Close => Disconnected
    },
    Connected => {
        // Duplicate acknowledgment
        Subscribed => Connected,
        ChannelError => Disconnected,
        TimedOut => Disconnected,
        Close => Disconnected
    }
}

pub use connection_machine::Input as ConnectionInput;
pub use connection_machine::State as ConnectionMachineState;
pub use connection_machine::StateMachine as ConnectionMachine;

/// Connection status surfaced read-only to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    /// Lowercase name for display and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ConnectionMachineState> for ConnectionStatus {
    fn from(state: &ConnectionMachineState) -> Self {
        match state {
            ConnectionMachineState::Disconnected => ConnectionStatus::Disconnected,
            ConnectionMachineState::Connecting => ConnectionStatus::Connecting,
            ConnectionMachineState::Connected => ConnectionStatus::Connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        let machine = ConnectionMachine::new();
        assert_eq!(*machine.state(), ConnectionMachineState::Disconnected);
        assert_eq!(
            ConnectionStatus::from(machine.state()),
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_open_then_subscribed() {
        let mut machine = ConnectionMachine::new();

        machine.consume(&ConnectionInput::Open).unwrap();
        assert_eq!(*machine.state(), ConnectionMachineState::Connecting);

        machine.consume(&ConnectionInput::Subscribed).unwrap();
        assert_eq!(*machine.state(), ConnectionMachineState::Connected);

        // Duplicate ack is harmless
        machine.consume(&ConnectionInput::Subscribed).unwrap();
        assert_eq!(*machine.state(), ConnectionMachineState::Connected);
    }

    #[test]
    fn test_failures_disconnect() {
        for failure in [ConnectionInput::ChannelError, ConnectionInput::TimedOut] {
            let mut machine = ConnectionMachine::new();
            machine.consume(&ConnectionInput::Open).unwrap();
            machine.consume(&failure).unwrap();
            assert_eq!(*machine.state(), ConnectionMachineState::Disconnected);

            let mut machine = ConnectionMachine::new();
            machine.consume(&ConnectionInput::Open).unwrap();
            machine.consume(&ConnectionInput::Subscribed).unwrap();
            machine.consume(&failure).unwrap();
            assert_eq!(*machine.state(), ConnectionMachineState::Disconnected);
        }
    }

    #[test]
    fn test_late_subscribed_after_failure_is_rejected() {
        let mut machine = ConnectionMachine::new();
        machine.consume(&ConnectionInput::Open).unwrap();
        machine.consume(&ConnectionInput::TimedOut).unwrap();

        assert!(machine.consume(&ConnectionInput::Subscribed).is_err());
        assert_eq!(*machine.state(), ConnectionMachineState::Disconnected);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut machine = ConnectionMachine::new();
        machine.consume(&ConnectionInput::Close).unwrap();
        machine.consume(&ConnectionInput::Close).unwrap();
        assert_eq!(*machine.state(), ConnectionMachineState::Disconnected);
    }

    #[test]
    fn test_cannot_open_twice() {
        let mut machine = ConnectionMachine::new();
        machine.consume(&ConnectionInput::Open).unwrap();
        assert!(machine.consume(&ConnectionInput::Open).is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Connecting).unwrap(),
            "\"connecting\""
        );
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
    }
}
