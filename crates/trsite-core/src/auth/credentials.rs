use anyhow::{Context, Result};
use keyring::Entry;

/// Keychain service the CLI files passwords under
const SERVICE_NAME: &str = "trsite";

/// Passwords remembered in the OS keychain, one entry per username.
///
/// Only the password is kept here. The session token lives in the
/// session store and is never written to the keychain.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, username)
            .with_context(|| format!("Failed to open keychain entry for {}", username))
    }

    /// Remember `password` for `username`, replacing any earlier one
    pub fn store(username: &str, password: &str) -> Result<()> {
        Self::entry(username)?
            .set_password(password)
            .context("Failed to save password to keychain")
    }

    pub fn get_password(username: &str) -> Result<String> {
        Self::entry(username)?
            .get_password()
            .context("No password saved in keychain")
    }

    /// Forget the password for `username`. Succeeds if none was saved.
    pub fn delete(username: &str) -> Result<()> {
        match Self::entry(username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to remove password from keychain"),
        }
    }
}
