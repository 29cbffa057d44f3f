//! Browser handles: the page-driving surface the rest of the crate talks to.
//!
//! A [`BrowserHandle`] can navigate, report its current location, read and
//! seed cookies, type into and submit forms, and query the loaded page with CSS
//! selectors. A [`BrowserLauncher`] produces fresh handles, optionally routed
//! through a proxy. Session, retry and extraction logic only see these traits,
//! so they run unchanged against [`HttpBrowser`] or any other driver.
//!
//! # Example
//!
//! ```no_run
//! use joblo_core::browser::{BrowserLauncher, HttpBrowserLauncher};
//!
//! # async fn example() -> Result<(), joblo_core::browser::BrowserError> {
//! let launcher = HttpBrowserLauncher::default();
//! let mut handle = launcher.launch(None).await?;
//! handle.navigate("https://www.linkedin.com/jobs/").await?;
//! let titles = handle.select_texts("h1").await?;
//! handle.close().await?;
//! # let _ = titles;
//! # Ok(())
//! # }
//! ```

mod error;
mod http;

use async_trait::async_trait;

pub use error::BrowserError;
pub use http::{HttpBrowser, HttpBrowserLauncher};

use crate::auth::CookieLine;
use crate::proxy::ProxyEndpoint;

/// One isolated browsing context.
///
/// A handle is used by exactly one retry attempt and closed when the attempt
/// ends, whatever its outcome.
#[async_trait]
pub trait BrowserHandle: Send {
    /// Loads `url`, following redirects.
    ///
    /// # Errors
    ///
    /// Network, timeout and HTTP status failures.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Returns the location after the last navigation or submission.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Closed`] after `close`.
    async fn current_url(&mut self) -> Result<String, BrowserError>;

    /// Cookies the handle would send to its current location.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Closed`] after `close`.
    async fn cookies(&mut self) -> Result<Vec<CookieLine>, BrowserError>;

    /// Seeds cookies into the handle's cookie store.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Closed`] after `close`.
    async fn add_cookies(&mut self, cookies: &[CookieLine]) -> Result<(), BrowserError>;

    /// Types one character into the field matching `selector`.
    ///
    /// # Errors
    ///
    /// [`BrowserError::ElementNotFound`] when no field matches.
    async fn type_char(&mut self, selector: &str, ch: char) -> Result<(), BrowserError>;

    /// Activates the submit control matching `selector`.
    ///
    /// # Errors
    ///
    /// [`BrowserError::ElementNotFound`] when no control matches, or any
    /// navigation error from the resulting request.
    async fn submit(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Normalized text of every element matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// [`BrowserError::InvalidSelector`] for malformed selectors.
    async fn select_texts(&mut self, selector: &str) -> Result<Vec<String>, BrowserError>;

    /// Value of `attr` on every element matching `selector` that carries it.
    ///
    /// # Errors
    ///
    /// [`BrowserError::InvalidSelector`] for malformed selectors.
    async fn select_attrs(
        &mut self,
        selector: &str,
        attr: &str,
    ) -> Result<Vec<String>, BrowserError>;

    /// Releases the handle. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Driver-specific shutdown failures.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Produces fresh, isolated browser handles.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Starts a handle, routed through `proxy` when given.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Launch`] when the handle cannot be started.
    async fn launch(
        &self,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Box<dyn BrowserHandle>, BrowserError>;
}
