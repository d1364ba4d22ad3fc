//! Server-side ride lifecycle procedures.

use serde::Deserialize;
use std::fmt;

/// Lifecycle procedures exposed over PostgREST RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleProcedure {
    /// Mark a ride completed and move it to history.
    Complete,
    /// Release a scheduled ride back to the open requests.
    ReturnToRequests,
    /// Cancel a ride, applying any fine server-side.
    Cancel,
}

impl LifecycleProcedure {
    /// RPC function name.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleProcedure::Complete => "move_ride_to_completed",
            LifecycleProcedure::ReturnToRequests => "move_ride_back_to_requests",
            LifecycleProcedure::Cancel => "move_ride_to_cancelled",
        }
    }
}

impl fmt::Display for LifecycleProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a procedure reported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcedureOutcome {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, alias = "message")]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl ProcedureOutcome {
    /// Interpret an RPC response body.
    ///
    /// Void functions return nothing, scalar functions a bare boolean, table
    /// functions an array. All are accepted; anything unrecognised counts as
    /// success since the call itself returned 2xx.
    pub fn from_response(body: &serde_json::Value) -> Self {
        match body {
            serde_json::Value::Bool(success) => Self {
                success: *success,
                error: None,
            },
            serde_json::Value::Array(rows) => rows
                .first()
                .map(Self::from_response)
                .unwrap_or_else(Self::ok),
            serde_json::Value::Object(_) => {
                serde_json::from_value(body.clone()).unwrap_or_else(|_| Self::ok())
            }
            _ => Self::ok(),
        }
    }

    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names() {
        assert_eq!(LifecycleProcedure::Complete.name(), "move_ride_to_completed");
        assert_eq!(
            LifecycleProcedure::ReturnToRequests.to_string(),
            "move_ride_back_to_requests"
        );
        assert_eq!(LifecycleProcedure::Cancel.name(), "move_ride_to_cancelled");
    }

    #[test]
    fn test_object_outcome() {
        let outcome = ProcedureOutcome::from_response(&json!({
            "success": false,
            "error": "Ride already completed"
        }));
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Ride already completed"));
    }

    #[test]
    fn test_message_alias() {
        let outcome =
            ProcedureOutcome::from_response(&json!({"success": false, "message": "nope"}));
        assert_eq!(outcome.error.as_deref(), Some("nope"));
    }

    #[test]
    fn test_lenient_shapes() {
        assert!(ProcedureOutcome::from_response(&serde_json::Value::Null).success);
        assert!(ProcedureOutcome::from_response(&json!(true)).success);
        assert!(!ProcedureOutcome::from_response(&json!(false)).success);
        assert!(ProcedureOutcome::from_response(&json!([])).success);
        assert!(!ProcedureOutcome::from_response(&json!([{"success": false}])).success);
        assert!(ProcedureOutcome::from_response(&json!({"fine_applied": 5})).success);
    }
}
