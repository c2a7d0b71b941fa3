//! Authentication primitives for the portal client
//!
//! Token persistence, local claim decoding and the HTTP calls that
//! produce credentials.

pub mod decoder;
pub mod models;
pub mod service;
mod token_store;

pub use decoder::{decode_claims, decode_session, Claims};
pub use models::{Credential, Portal, Role, Session, SessionState};
pub use service::{AuthApi, AuthService, Registration};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
