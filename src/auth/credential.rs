//! Login credentials supplied by the operator.

use std::fmt;

/// Identifier and secret used for credential login.
///
/// Only the identifier appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identifier: String,
    secret: String,
}

impl Credential {
    /// Creates a credential.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Login identifier; also names the account session tokens are stored under.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Login secret. Never log it.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
