//! The client-side session cache.
//!
//! `SessionAuthenticator` is the only writer of the stored session and the
//! only publisher of the current-session signal. Build one at startup and
//! hand it (usually behind an `Arc`) to whatever needs to log in, log out
//! or watch the session.
//!
//! Every state change (store write or clear, client token, publish) runs
//! under one lock, so the store, the client token and the signal always
//! agree, and overlapping operations resolve last-write-wins. Observers run
//! under that lock and must not call back into `login`/`logout`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi};
use crate::signal::{CurrentValue, Subscription};
use crate::store::{KeyValueStore, StoreError};

use super::{AuthError, Credentials, Registration, Session};

/// Store key the session is persisted under
pub const SESSION_KEY: &str = "user";

pub struct SessionAuthenticator<A, S> {
    api: Arc<A>,
    store: S,
    current: CurrentValue<Option<Session>>,
    transition: Mutex<()>,
}

impl<A: AuthApi, S: KeyValueStore> SessionAuthenticator<A, S> {
    /// Create an authenticator, restoring any session saved in `store`.
    ///
    /// A restored session's token is handed to `api` straight away so
    /// requests made before the next login are authenticated.
    pub fn new(api: Arc<A>, store: S) -> Self {
        let session = Self::read_stored(&store);
        if let Some(ref session) = session {
            debug!("Restored session from store");
            api.set_auth_token(Some(&session.token));
        }
        Self {
            api,
            store,
            current: CurrentValue::new(session),
            transition: Mutex::new(()),
        }
    }

    /// Log in with `credentials`.
    ///
    /// On failure nothing local changes and the API error is returned as is.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        debug!(identifier = %credentials.identifier, "Logging in");
        let session = self.api.login(credentials).await?;
        self.establish(session)
    }

    /// Register a new account. A successful registration logs the user in.
    pub async fn register(&self, profile: &Registration) -> Result<Session, AuthError> {
        debug!(identifier = %profile.identifier, "Registering");
        let session = self.api.register(profile).await?;
        self.establish(session)
    }

    /// Forget the session locally, then tell the server.
    ///
    /// Local state is cleared before this returns. The server call runs as
    /// a background task and is made even without a session, carrying
    /// whatever token the client held; its failure is only logged. The
    /// returned handle can be awaited to wait for it, and is `None` when
    /// there is no Tokio runtime to run it on.
    pub fn logout(&self) -> Option<JoinHandle<()>> {
        let token = {
            let _transition = self.lock_transition();
            let previous = self.current.get();
            let token = previous
                .as_ref()
                .map(|session| session.token.clone())
                .or_else(|| self.api.auth_token());

            if let Err(e) = self.store.clear(SESSION_KEY) {
                warn!(error = %e, "Failed to clear stored session");
            }
            self.api.set_auth_token(None);

            if previous.is_some() {
                self.current.publish(None);
                info!("Logged out");
            } else {
                debug!("Logout without an active session");
            }
            token
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, skipping remote logout");
                return None;
            }
        };
        let api = Arc::clone(&self.api);
        Some(handle.spawn(async move {
            if let Err(e) = api.logout(token).await {
                warn!(error = %e, "Remote logout failed");
            }
        }))
    }

    /// The current session, if logged in
    pub fn current(&self) -> Option<Session> {
        self.current.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.get().is_some()
    }

    /// Watch the session. `observer` is called right away with the current
    /// value and again after every login, registration and logout.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&Option<Session>) + Send + Sync + 'static,
    {
        self.current.subscribe(observer)
    }

    /// Persist, configure the client, then publish. If the session is
    /// unusable or the store write fails nothing else happens, so memory
    /// never disagrees with the store.
    fn establish(&self, session: Session) -> Result<Session, AuthError> {
        if !session.is_valid() {
            return Err(ApiError::InvalidResponse("session has an empty token".to_string()).into());
        }
        let value = serde_json::to_value(&session).map_err(|source| StoreError::Encode {
            key: SESSION_KEY.to_string(),
            source,
        })?;

        let _transition = self.lock_transition();
        self.store.store(SESSION_KEY, &value)?;
        self.api.set_auth_token(Some(&session.token));
        self.current.publish(Some(session.clone()));
        info!("Session established");
        Ok(session)
    }

    fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_stored(store: &S) -> Option<Session> {
        let value = match store.retrieve(SESSION_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                return None;
            }
        };
        match serde_json::from_value::<Session>(value) {
            Ok(session) if session.is_valid() => Some(session),
            Ok(_) => {
                warn!("Stored session has an empty token, ignoring");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse stored session");
                None
            }
        }
    }
}
