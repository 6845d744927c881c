//! Status derivation for monitored endpoints.
//!
//! Turns raw probe records into one reconciled [`EndpointSummary`] per
//! endpoint. Everything here is a pure function of its inputs.

mod aggregate;
mod classify;

pub use aggregate::*;
pub use classify::*;
