//! Encrypted-at-rest persistence of per-account session tokens.
//!
//! One token file per account lives under
//! `<state dir>/sessions/<sha256(account)>.enc`, where the state dir is
//! `$JOBLO_STATE_DIR`, `$XDG_CONFIG_HOME/joblo`, `~/.config/joblo` or
//! `%APPDATA%\joblo` (first one set wins). Files are sealed with
//! XChaCha20-Poly1305 under a key derived from `$JOBLO_MASTER_KEY` or a
//! generated key kept in the system keychain.
//!
//! Only the session manager writes tokens, and only after an authentication
//! it has verified. A token that fails to decrypt or parse is reported as
//! [`SessionStoreError`] so callers can fall back to credential login.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::CookieLine;

const APP_DIR: &str = "joblo";
const SESSIONS_DIR: &str = "sessions";
const KEYRING_SERVICE: &str = "joblo";
const KEYRING_ENTRY_NAME: &str = "session-master-key-v1";
const MASTER_KEY_ENV: &str = "JOBLO_MASTER_KEY";
const STATE_DIR_ENV: &str = "JOBLO_STATE_DIR";
const MAGIC: &[u8; 4] = b"JBS1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;
const TOKEN_VERSION: u32 = 1;

/// Errors for session token persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// No state directory could be resolved.
    #[error("unable to determine state directory (set JOBLO_STATE_DIR, XDG_CONFIG_HOME or HOME)")]
    StateDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Token (de)serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// No master key in the environment and the keychain was unusable.
    #[error("unable to access system keychain for the session key; set JOBLO_MASTER_KEY")]
    KeychainUnavailable,
    /// Token file is truncated or not ours.
    #[error("persisted session token is invalid")]
    InvalidPayload,
    /// Sealing failed.
    #[error("failed to encrypt session token")]
    EncryptionFailed,
    /// Opening failed (wrong key or tampered file).
    #[error("failed to decrypt session token")]
    DecryptionFailed,
}

/// Persisted proof of a prior successful authentication for one account.
#[derive(Clone)]
pub struct SessionToken {
    /// Account the cookies belong to.
    pub account: String,
    /// Cookies captured after authentication.
    pub cookies: Vec<CookieLine>,
    /// Unix time the token was captured.
    pub captured_at: u64,
}

impl SessionToken {
    /// Creates a token stamped with the current time.
    #[must_use]
    pub fn new(account: impl Into<String>, cookies: Vec<CookieLine>) -> Self {
        let captured_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            account: account.into(),
            cookies,
            captured_at,
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("account", &self.account)
            .field("cookies", &self.cookies.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Storage for session tokens, keyed by account.
pub trait SessionStore: Send + Sync {
    /// Loads the token for `account`, `Ok(None)` when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError`] when a token exists but cannot be read.
    fn load(&self, account: &str) -> Result<Option<SessionToken>, SessionStoreError>;

    /// Replaces the token for `token.account`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError`] when the token cannot be written.
    fn save(&self, token: &SessionToken) -> Result<(), SessionStoreError>;

    /// Deletes the token for `account`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError`] when removal fails.
    fn clear(&self, account: &str) -> Result<bool, SessionStoreError>;
}

/// Session tokens sealed into per-account files.
pub struct EncryptedFileSessionStore {
    dir: PathBuf,
    key_material: String,
}

impl fmt::Debug for EncryptedFileSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFileSessionStore")
            .field("dir", &self.dir)
            .field("key_material", &"[REDACTED]")
            .finish()
    }
}

impl EncryptedFileSessionStore {
    /// Creates a store rooted at `state_dir` using explicit key material.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>, key_material: impl Into<String>) -> Self {
        Self {
            dir: state_dir.into().join(SESSIONS_DIR),
            key_material: key_material.into(),
        }
    }

    /// Opens the store at the default location with the default key.
    ///
    /// Explicit overrides win over the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::StateDirUnavailable`] or
    /// [`SessionStoreError::KeychainUnavailable`].
    pub fn open(
        state_dir: Option<PathBuf>,
        master_key: Option<String>,
    ) -> Result<Self, SessionStoreError> {
        let dir = match state_dir {
            Some(dir) => dir,
            None => default_state_dir()?,
        };
        let key = match master_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => key,
            None => load_or_create_key()?,
        };
        Ok(Self::new(dir, key))
    }

    /// Path of the token file for `account`.
    #[must_use]
    pub fn token_path(&self, account: &str) -> PathBuf {
        let digest = Sha256::digest(account.as_bytes());
        self.dir.join(format!("{}.enc", hex_encode(&digest)))
    }
}

impl SessionStore for EncryptedFileSessionStore {
    #[instrument(level = "debug", skip(self))]
    fn load(&self, account: &str) -> Result<Option<SessionToken>, SessionStoreError> {
        let path = self.token_path(account);
        if !path.exists() {
            return Ok(None);
        }
        let sealed = fs::read(&path)?;
        let plaintext = open_bytes(&sealed, &self.key_material)?;
        let stored: StoredToken = serde_json::from_slice(&plaintext)?;
        if stored.version != TOKEN_VERSION || stored.account != account {
            return Err(SessionStoreError::InvalidPayload);
        }
        debug!(cookies = stored.cookies.len(), "loaded session token");
        Ok(Some(stored.into_token()))
    }

    #[instrument(level = "debug", skip(self, token), fields(account = %token.account))]
    fn save(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        let plaintext = serde_json::to_vec(&StoredToken::from_token(token))?;
        let sealed = seal_bytes(&plaintext, &self.key_material)?;
        write_owner_only(&self.token_path(&token.account), &sealed)?;
        debug!(cookies = token.cookies.len(), "saved session token");
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn clear(&self, account: &str) -> Result<bool, SessionStoreError> {
        let path = self.token_path(account);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    tokens: Mutex<HashMap<String, SessionToken>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, account: &str) -> Result<Option<SessionToken>, SessionStoreError> {
        let tokens = self.tokens.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tokens.get(account).cloned())
    }

    fn save(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        tokens.insert(token.account.clone(), token.clone());
        Ok(())
    }

    fn clear(&self, account: &str) -> Result<bool, SessionStoreError> {
        let mut tokens = self.tokens.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tokens.remove(account).is_some())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredToken {
    version: u32,
    account: String,
    captured_at: u64,
    cookies: Vec<StoredCookie>,
}

impl StoredToken {
    fn from_token(token: &SessionToken) -> Self {
        Self {
            version: TOKEN_VERSION,
            account: token.account.clone(),
            captured_at: token.captured_at,
            cookies: token.cookies.iter().map(StoredCookie::from).collect(),
        }
    }

    fn into_token(self) -> SessionToken {
        SessionToken {
            account: self.account,
            captured_at: self.captured_at,
            cookies: self.cookies.into_iter().map(CookieLine::from).collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCookie {
    domain: String,
    tailmatch: bool,
    path: String,
    secure: bool,
    expires: u64,
    name: String,
    value: String,
}

impl From<&CookieLine> for StoredCookie {
    fn from(cookie: &CookieLine) -> Self {
        Self {
            domain: cookie.domain.clone(),
            tailmatch: cookie.tailmatch,
            path: cookie.path.clone(),
            secure: cookie.secure,
            expires: cookie.expires,
            name: cookie.name.clone(),
            value: cookie.value().to_string(),
        }
    }
}

impl From<StoredCookie> for CookieLine {
    fn from(stored: StoredCookie) -> Self {
        CookieLine::new(
            stored.domain,
            stored.tailmatch,
            stored.path,
            stored.secure,
            stored.expires,
            stored.name,
            stored.value,
        )
    }
}

fn default_state_dir() -> Result<PathBuf, SessionStoreError> {
    resolve_state_dir(
        non_blank(env::var_os(STATE_DIR_ENV)),
        non_blank(env::var_os("XDG_CONFIG_HOME")),
        non_blank(env::var_os("HOME")),
        non_blank(env::var_os("APPDATA")),
    )
}

fn non_blank(value: Option<OsString>) -> Option<PathBuf> {
    value
        .filter(|v| !v.to_string_lossy().trim().is_empty())
        .map(PathBuf::from)
}

fn resolve_state_dir(
    explicit: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, SessionStoreError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR));
    }
    app_data
        .map(|dir| dir.join(APP_DIR))
        .ok_or(SessionStoreError::StateDirUnavailable)
}

fn load_or_create_key() -> Result<String, SessionStoreError> {
    if let Some(key) = env::var_os(MASTER_KEY_ENV) {
        let key = key.to_string_lossy().trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    // The keyring backends may panic on headless hosts.
    let entry = catch_unwind(|| keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY_NAME))
        .map_err(|_| SessionStoreError::KeychainUnavailable)?
        .map_err(|_| SessionStoreError::KeychainUnavailable)?;

    match catch_unwind(AssertUnwindSafe(|| entry.get_password())) {
        Ok(Ok(existing)) if !existing.trim().is_empty() => Ok(existing),
        _ => {
            let generated = generate_key_material();
            catch_unwind(AssertUnwindSafe(|| entry.set_password(&generated)))
                .map_err(|_| SessionStoreError::KeychainUnavailable)?
                .map_err(|_| SessionStoreError::KeychainUnavailable)?;
            Ok(generated)
        }
    }
}

fn generate_key_material() -> String {
    let mut bytes = [0_u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

fn derive_key(key_material: &str) -> [u8; KEY_LEN] {
    let digest = Sha256::digest(key_material.as_bytes());
    let mut key = [0_u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

fn seal_bytes(plaintext: &[u8], key_material: &str) -> Result<Vec<u8>, SessionStoreError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&derive_key(key_material)));
    let mut nonce = [0_u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| SessionStoreError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(MAGIC);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open_bytes(sealed: &[u8], key_material: &str) -> Result<Vec<u8>, SessionStoreError> {
    let Some(rest) = sealed.strip_prefix(MAGIC.as_slice()) else {
        return Err(SessionStoreError::InvalidPayload);
    };
    if rest.len() < NONCE_LEN {
        return Err(SessionStoreError::InvalidPayload);
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    XChaCha20Poly1305::new(Key::from_slice(&derive_key(key_material)))
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| SessionStoreError::DecryptionFailed)
}

fn write_owner_only(path: &Path, payload: &[u8]) -> Result<(), SessionStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, payload)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
