//! Authenticated request core for the WorkHub workforce dashboard.
//!
//! Everything user-facing (attendance sheets, leave forms, task boards) lives
//! in the UI layer and talks to the backend exclusively through
//! [`client::ApiClient`]. This crate owns credential storage, bearer-token
//! attachment, transparent refresh with request replay, proactive refresh
//! ahead of expiry, and clean session teardown when refresh is no longer
//! possible.

pub mod client;

pub(crate) mod utils;

pub use client::ApiClient;
