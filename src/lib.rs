//! SCIM 2.0 provisioning service.
//!
//! Users and groups are held in an in-memory store, queried with SCIM
//! filters, and every committed change is mirrored to an optional downstream
//! SCIM server.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod forward;
pub mod patch;
pub mod projection;
pub mod state;
pub mod store;
