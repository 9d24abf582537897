//! trsite core library.
//!
//! Client-side authentication for the tr-site Django REST API:
//!
//! - `api`: HTTP client for the `/auth/` endpoints
//! - `auth`: session model, `SessionAuthenticator`, keychain credentials
//! - `store`: durable key-value stores the session is persisted to
//! - `signal`: current-value publisher observed by the rest of an app
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod signal;
pub mod store;

pub use api::{ApiError, AuthApi, DjangoClient};
pub use auth::{AuthError, Credentials, Registration, Session, SessionAuthenticator};
pub use config::Config;
pub use signal::{CurrentValue, Subscription};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
