//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: the token plus profile returned by the backend
//! - `SessionAuthenticator`: login/register/logout with a persisted,
//!   observable current session
//! - `CredentialStore`: Secure OS-level credential storage via keyring
//!
//! Sessions are persisted under the `"user"` key of a `KeyValueStore` and
//! have no client-side expiry; the server decides when a token is invalid.

pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod session;

pub use authenticator::{SessionAuthenticator, SESSION_KEY};
pub use credentials::CredentialStore;
pub use error::AuthError;
pub use session::{Credentials, Registration, Session};
