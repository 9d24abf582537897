use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend rejected the request or could not be reached.
    /// Carries the client error unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The backend accepted the login but the session could not be saved.
    /// Local state is left as it was.
    #[error("Failed to persist session: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            AuthError::Api(e) => Some(e),
            AuthError::Store(_) => None,
        }
    }
}
