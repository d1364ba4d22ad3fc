//! Ride Store client.
//!
//! Reads ride rows and messages through PostgREST and invokes the server-side
//! lifecycle procedures by name. Status transitions are never written
//! directly; the procedures own them.

mod client;
mod error;
mod procedure;

pub use client::{NewMessage, RideStoreClient};
pub use error::{RideStoreError, RideStoreResult};
pub use procedure::{LifecycleProcedure, ProcedureOutcome};
