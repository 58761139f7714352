//! Authenticated HTTP layer.
//!
//! `SessionClient` wraps a `Transport` and applies the token lifecycle to
//! every request: credential attachment, rotation-header inspection, and the
//! single refresh-and-replay on unauthorized responses. The business CRUD
//! endpoints live in the consuming application, not here.

pub mod client;
pub mod error;
pub mod transport;

pub use client::SessionClient;
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
