//! Session cookies persisted between runs.

use keyring::Entry;
use tracing::debug;

use crate::core::keyring::KeyringAccessError;
use crate::utils::url::origin_of;

const KEYRING_SERVICE: &str = "readmegen";

/// Stores the cookie header for an API origin in the system keyring.
///
/// With `use_keyring` off every operation is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    use_keyring: bool,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CredentialStore {
    pub fn new(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn is_enabled(&self) -> bool {
        self.use_keyring
    }

    /// Keyring account for `api_url`: its origin, or the URL itself when it
    /// has none.
    pub fn account_for(api_url: &str) -> String {
        origin_of(api_url).unwrap_or_else(|| api_url.trim_end_matches('/').to_string())
    }

    pub fn load(&self, api_url: &str) -> Result<Option<String>, KeyringAccessError> {
        if !self.use_keyring {
            return Ok(None);
        }

        let entry = Entry::new(KEYRING_SERVICE, &Self::account_for(api_url))?;
        match entry.get_password() {
            Ok(cookies) if cookies.trim().is_empty() => Ok(None),
            Ok(cookies) => Ok(Some(cookies)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, api_url: &str, cookie_header: &str) -> Result<(), KeyringAccessError> {
        if !self.use_keyring {
            return Ok(());
        }

        let account = Self::account_for(api_url);
        let entry = Entry::new(KEYRING_SERVICE, &account)?;
        entry.set_password(cookie_header)?;
        debug!(account = %account, "Stored session cookies");
        Ok(())
    }

    /// Deletes stored cookies; returns whether anything was removed.
    pub fn remove(&self, api_url: &str) -> Result<bool, KeyringAccessError> {
        if !self.use_keyring {
            return Ok(false);
        }

        let entry = Entry::new(KEYRING_SERVICE, &Self::account_for(api_url))?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
