use std::error::Error;
use std::fmt;

/// A failed keyring operation.
///
/// `Recoverable` means the backend was unavailable (locked keychain, no
/// secret service on the bus); the CLI keeps going without stored
/// credentials. `Permanent` is reported as is.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyringAccessError::Recoverable(err) => write!(f, "keyring unavailable: {err}"),
            KeyringAccessError::Permanent(err) => write!(f, "keyring error: {err}"),
        }
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_outages_are_recoverable() {
        let error = KeyringAccessError::from(keyring::Error::NoStorageAccess(Box::new(
            std::io::Error::other("locked"),
        )));
        assert!(error.is_recoverable());
        assert!(error.to_string().starts_with("keyring unavailable"));
    }

    #[test]
    fn other_failures_are_permanent() {
        let error = KeyringAccessError::from(keyring::Error::TooLong("account".into(), 255));
        assert!(!error.is_recoverable());
        assert!(error.source().is_some());
    }
}
