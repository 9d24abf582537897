//! REST API client module for the tr-site backend.
//!
//! This module provides the `AuthApi` seam the authenticator talks to and
//! `DjangoClient`, its HTTP implementation against the Django REST API.
//!
//! The API uses token authentication: a successful login or registration
//! returns a token which is sent in the `Authorization` header afterwards.

pub mod client;
pub mod error;

pub use client::{AuthApi, DjangoClient};
pub use error::ApiError;
