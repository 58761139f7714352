//! Token lifecycle primitives: tiered storage, claims decoding, derived
//! session state, and the bounded acquisition wait.
//!
//! Everything here is transport-agnostic. The `api` module composes these
//! pieces into the request-attachment and refresh behavior.

pub mod codec;
pub mod state;
pub mod store;
pub mod tier;
pub mod waiter;

pub use codec::{decode, Claims, DecodeError};
pub use state::{classify, SessionState};
pub use store::{StoreEvent, TokenStore};
pub use tier::{FileTier, GlobalTier, MemoryTier, TokenTier};
pub use waiter::{wait_for_token, AcquisitionTimeout};
