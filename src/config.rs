//! Process configuration read from the environment.
//!
//! Credentials never live in source or on the command line:
//! `JOBLO_IDENTIFIER` and `JOBLO_SECRET` supply them. Without both, only
//! cookie restore is possible.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::Credential;

/// Login identifier variable.
pub const ENV_IDENTIFIER: &str = "JOBLO_IDENTIFIER";
/// Login secret variable.
pub const ENV_SECRET: &str = "JOBLO_SECRET";
/// `SQLite` database path variable.
pub const ENV_DATABASE: &str = "JOBLO_DATABASE";
/// Proxy list path variable.
pub const ENV_PROXY_FILE: &str = "JOBLO_PROXY_FILE";
/// Session token directory variable.
pub const ENV_STATE_DIR: &str = "JOBLO_STATE_DIR";
/// Token encryption key material variable.
pub const ENV_MASTER_KEY: &str = "JOBLO_MASTER_KEY";

const DEFAULT_DATABASE: &str = "joblo.db";
const DEFAULT_PROXY_FILE: &str = "proxies.txt";
const DEFAULT_ACCOUNT: &str = "default";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Only one of identifier and secret is set.
    #[error("{present} is set but {missing} is not; set both or neither")]
    IncompleteCredential {
        present: &'static str,
        missing: &'static str,
    },
}

/// Resolved settings.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub credential: Option<Credential>,
    pub database: PathBuf,
    pub proxy_file: PathBuf,
    pub state_dir: Option<PathBuf>,
    pub master_key: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("credential", &self.credential)
            .field("database", &self.database)
            .field("proxy_file", &self.proxy_file)
            .field("state_dir", &self.state_dir)
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::IncompleteCredential`] when only half a credential is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// [`ConfigError::IncompleteCredential`] when only half a credential is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let credential = match (get(ENV_IDENTIFIER), get(ENV_SECRET)) {
            (Some(identifier), Some(secret)) => Some(Credential::new(identifier.trim(), secret)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredential {
                    present: ENV_IDENTIFIER,
                    missing: ENV_SECRET,
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredential {
                    present: ENV_SECRET,
                    missing: ENV_IDENTIFIER,
                });
            }
        };

        Ok(Self {
            credential,
            database: get(ENV_DATABASE).map_or_else(|| DEFAULT_DATABASE.into(), PathBuf::from),
            proxy_file: get(ENV_PROXY_FILE).map_or_else(|| DEFAULT_PROXY_FILE.into(), PathBuf::from),
            state_dir: get(ENV_STATE_DIR).map(PathBuf::from),
            master_key: get(ENV_MASTER_KEY),
        })
    }

    /// Account session tokens are stored under: the login identifier, or
    /// `default` when no credential is configured.
    #[must_use]
    pub fn account(&self) -> &str {
        self.credential
            .as_ref()
            .map_or(DEFAULT_ACCOUNT, Credential::identifier)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = settings(&[]).unwrap();
        assert!(settings.credential.is_none());
        assert_eq!(settings.database, PathBuf::from("joblo.db"));
        assert_eq!(settings.proxy_file, PathBuf::from("proxies.txt"));
        assert!(settings.state_dir.is_none());
        assert_eq!(settings.account(), "default");
    }

    #[test]
    fn test_full_credential_sets_account() {
        let settings = settings(&[
            (ENV_IDENTIFIER, " ops@example.com "),
            (ENV_SECRET, "hunter2"),
            (ENV_DATABASE, "/tmp/x.db"),
        ])
        .unwrap();
        assert_eq!(settings.account(), "ops@example.com");
        assert_eq!(settings.database, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_half_credential_rejected() {
        let err = settings(&[(ENV_IDENTIFIER, "ops@example.com")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::IncompleteCredential {
                present: ENV_IDENTIFIER,
                missing: ENV_SECRET
            }
        );
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let settings = settings(&[(ENV_IDENTIFIER, "  "), (ENV_SECRET, "")]).unwrap();
        assert!(settings.credential.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = settings(&[
            (ENV_IDENTIFIER, "ops"),
            (ENV_SECRET, "hunter2"),
            (ENV_MASTER_KEY, "masterkey"),
        ])
        .unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("masterkey"));
    }
}
