//! Session token lifecycle for the Studyhall study-group client.
//!
//! A client with no central process and shared, racy storage (several
//! windows, reloads, navigation-triggered eviction) still has to keep one
//! bearer credential coherent. This crate owns that problem: acquiring,
//! persisting, attaching, rotating, and recovering the session token.
//!
//! - [`Session`] is the facade the application depends on: get, set, remove,
//!   validate, and wait for the token.
//! - [`SessionClient`] wraps an HTTP [`Transport`] and applies the lifecycle
//!   to every request: attach, observe rotation headers, refresh once and
//!   replay once on an unauthorized response.
//! - [`TokenStore`] resolves ranked storage tiers (durable file, in-memory
//!   backup, process-global fallback) with durable-tier backfill.
//!
//! Expiry is checked lazily when a request is attached or classified; there
//! is no background timer. The library never navigates or renders anything -
//! a failed refresh surfaces as the original unauthorized response and the
//! consuming layer decides what re-authentication looks like.

pub mod api;
pub mod config;
pub mod session;
pub mod token;

pub use api::{ApiError, ApiRequest, ApiResponse, HttpTransport, SessionClient, Transport};
pub use config::AuthConfig;
pub use session::Session;
pub use token::{
    classify, decode, AcquisitionTimeout, Claims, DecodeError, SessionState, TokenStore,
};
