//! Authentication: credentials, cookies, persisted session tokens and the
//! session manager that ties them together.
//!
//! - [`SessionManager`] brings a browser handle to an authenticated state,
//!   preferring stored cookies over a fresh credential login.
//! - [`SessionStore`] persists one [`SessionToken`] per account, encrypted at
//!   rest by [`EncryptedFileSessionStore`].
//! - [`parse_cookie_import`] turns a browser cookie export into a token seed
//!   for accounts that must pass an interactive challenge out of band.

mod capture;
mod cookies;
mod credential;
mod session;
mod site;
mod storage;

pub use capture::{
    ImportError, ImportFormat, ImportedCookies, cookies_for_host, parse_cookie_import,
    unique_domain_count,
};
pub use cookies::{
    CookieError, CookieLine, ParseResult, export_jar, parse_netscape_cookies, seed_jar,
};
pub use credential::Credential;
pub use session::{
    Authenticator, CREDENTIALS_NOT_CONFIGURED, SessionManager, SessionState, SessionTiming,
};
pub use site::SiteProfile;
pub use storage::{
    EncryptedFileSessionStore, MemorySessionStore, SessionStore, SessionStoreError, SessionToken,
};
