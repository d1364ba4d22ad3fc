//! Supabase REST API client for rides and messages.

use crate::error::{RideStoreError, RideStoreResult};
use crate::procedure::{LifecycleProcedure, ProcedureOutcome};
use ride_types::{RideId, RideMessage, RideSnapshot, UserId};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Message payload for insert.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub ride_id: RideId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub content: String,
}

/// Ride Store client. Every call runs as the user behind `access_token`.
#[derive(Clone)]
pub struct RideStoreClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    rides_table: String,
    messages_table: String,
}

impl RideStoreClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The Supabase publishable API key
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            rides_table: "rides".to_string(),
            messages_table: "messages".to_string(),
        }
    }

    /// Use different table names.
    pub fn with_tables(mut self, rides: impl Into<String>, messages: impl Into<String>) -> Self {
        self.rides_table = rides.into();
        self.messages_table = messages.into();
        self
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    /// Build the RPC URL for a database function.
    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.api_url, function)
    }

    fn authed(&self, request: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
    }

    fn ride_request(&self, ride_id: &RideId, access_token: &str) -> reqwest::RequestBuilder {
        self.authed(
            self.http_client
                .get(self.rest_url(&self.rides_table))
                .query(&[("id", format!("eq.{}", ride_id)), ("select", "*".to_string())]),
            access_token,
        )
    }

    fn messages_request(&self, ride_id: &RideId, access_token: &str) -> reqwest::RequestBuilder {
        self.authed(
            self.http_client
                .get(self.rest_url(&self.messages_table))
                .query(&[
                    ("ride_id", format!("eq.{}", ride_id)),
                    ("select", "*".to_string()),
                    ("order", "created_at.asc".to_string()),
                ]),
            access_token,
        )
    }

    fn procedure_request(
        &self,
        procedure: LifecycleProcedure,
        params: &serde_json::Value,
        access_token: &str,
    ) -> reqwest::RequestBuilder {
        self.authed(
            self.http_client
                .post(self.rpc_url(procedure.name()))
                .header("Content-Type", "application/json")
                .json(params),
            access_token,
        )
    }

    /// Fetch the current ride row.
    pub async fn fetch_ride(
        &self,
        ride_id: &RideId,
        access_token: &str,
    ) -> RideStoreResult<RideSnapshot> {
        debug!(ride_id = %ride_id, "Fetching ride");

        let response = self.ride_request(ride_id, access_token).send().await?;
        let rows = self.json_rows(response).await?;
        let row = rows
            .first()
            .ok_or_else(|| RideStoreError::NotFound(format!("ride {}", ride_id)))?;

        Ok(RideSnapshot::from_row(row)?)
    }

    /// Fetch a ride's messages, oldest first.
    ///
    /// Rows that fail to parse are skipped with a warning.
    pub async fn fetch_messages(
        &self,
        ride_id: &RideId,
        access_token: &str,
    ) -> RideStoreResult<Vec<RideMessage>> {
        debug!(ride_id = %ride_id, "Fetching messages");

        let response = self.messages_request(ride_id, access_token).send().await?;
        let rows = self.json_rows(response).await?;

        let messages = parse_messages(&rows);
        debug!(ride_id = %ride_id, count = messages.len(), "Messages fetched");
        Ok(messages)
    }

    /// Insert a message and return the stored row.
    pub async fn send_message(
        &self,
        message: &NewMessage,
        access_token: &str,
    ) -> RideStoreResult<RideMessage> {
        debug!(ride_id = %message.ride_id, "Sending message");

        let response = self
            .authed(
                self.http_client.post(self.rest_url(&self.messages_table)),
                access_token,
            )
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(message)
            .send()
            .await?;

        let rows = self.json_rows(response).await?;
        let row = rows
            .first()
            .ok_or_else(|| RideStoreError::NotFound("inserted message".to_string()))?;

        let stored = RideMessage::from_row(row)?;
        debug!(ride_id = %message.ride_id, message_id = %stored.id, "Message sent");
        Ok(stored)
    }

    /// Complete a ride.
    pub async fn complete_ride(
        &self,
        ride_id: &RideId,
        access_token: &str,
    ) -> RideStoreResult<ProcedureOutcome> {
        self.call_procedure(
            LifecycleProcedure::Complete,
            serde_json::json!({ "ride_id": ride_id }),
            access_token,
        )
        .await
    }

    /// Put a ride back into the open requests.
    pub async fn return_ride_to_requests(
        &self,
        ride_id: &RideId,
        access_token: &str,
    ) -> RideStoreResult<ProcedureOutcome> {
        self.call_procedure(
            LifecycleProcedure::ReturnToRequests,
            serde_json::json!({ "ride_id": ride_id }),
            access_token,
        )
        .await
    }

    /// Cancel a ride on behalf of `cancelled_by`.
    pub async fn cancel_ride(
        &self,
        ride_id: &RideId,
        cancelled_by: &UserId,
        reason: Option<&str>,
        access_token: &str,
    ) -> RideStoreResult<ProcedureOutcome> {
        self.call_procedure(
            LifecycleProcedure::Cancel,
            cancel_params(ride_id, cancelled_by, reason),
            access_token,
        )
        .await
    }

    async fn call_procedure(
        &self,
        procedure: LifecycleProcedure,
        params: serde_json::Value,
        access_token: &str,
    ) -> RideStoreResult<ProcedureOutcome> {
        info!(procedure = %procedure, "Calling ride procedure");

        let response = self
            .procedure_request(procedure, &params, access_token)
            .send()
            .await?;
        let response = self.check_response(response).await?;

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        let outcome = ProcedureOutcome::from_response(&body);
        if !outcome.success {
            let message = outcome
                .error
                .clone()
                .unwrap_or_else(|| "procedure reported failure".to_string());
            warn!(procedure = %procedure, %message, "Ride procedure failed");
            return Err(RideStoreError::Procedure {
                name: procedure.name().to_string(),
                message,
            });
        }

        info!(procedure = %procedure, "Ride procedure succeeded");
        Ok(outcome)
    }

    // =========================================================================
    // HTTP helpers
    // =========================================================================

    /// Read a PostgREST array response.
    async fn json_rows(&self, response: reqwest::Response) -> RideStoreResult<Vec<serde_json::Value>> {
        let response = self.check_response(response).await?;
        Ok(response.json::<Vec<serde_json::Value>>().await?)
    }

    /// Check HTTP response for errors.
    async fn check_response(&self, response: reqwest::Response) -> RideStoreResult<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Supabase request failed: {} - {}", status, body);
            return Err(RideStoreError::Supabase {
                status,
                message: body,
            });
        }
        Ok(response)
    }
}

fn cancel_params(ride_id: &RideId, cancelled_by: &UserId, reason: Option<&str>) -> serde_json::Value {
    let mut params = serde_json::json!({
        "ride_id": ride_id,
        "cancelled_by": cancelled_by,
    });
    if let Some(reason) = reason {
        params["cancellation_reason"] = serde_json::json!(reason);
    }
    params
}

fn parse_messages(rows: &[serde_json::Value]) -> Vec<RideMessage> {
    rows.iter()
        .filter_map(|row| match RideMessage::from_row(row) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Skipping malformed message row");
                None
            }
        })
        .collect()
}

impl std::fmt::Debug for RideStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RideStoreClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
