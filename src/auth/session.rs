//! Session establishment: cookie restore first, credential login second,
//! operator-assisted verification last.
//!
//! # State machine
//!
//! ```text
//! NoSession ──► CookieRestoreAttempted ──► Authenticated
//!     │                  │
//!     │                  ▼ (rejected)
//!     └────────► CredentialLoginAttempted ──► Authenticated
//!                        │        │
//!                        │        └──► Failed (unexpected location)
//!                        ▼
//!                 ChallengePending ──► Authenticated | Failed (timeout)
//! ```
//!
//! Only a location containing the authenticated marker counts as success.
//! Tokens are written after credential login or a resolved challenge, never
//! after a restore, and a restore the site rejects deletes the stored token.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::{Credential, SessionStore, SessionToken, SiteProfile};
use crate::browser::{BrowserError, BrowserHandle};
use crate::pacing::JitterRange;
use crate::retry::AttemptOutcome;

/// Reason reported when credential login is needed but no credential is set.
pub const CREDENTIALS_NOT_CONFIGURED: &str = "credentials not configured";

/// Where the last establishment got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing attempted yet.
    NoSession,
    /// Stored cookies were seeded and the landing page requested.
    CookieRestoreAttempted,
    /// Credentials were (or were about to be) submitted.
    CredentialLoginAttempted,
    /// A verification challenge is waiting for the operator.
    ChallengePending,
    /// The handle holds an authenticated session.
    Authenticated,
    /// Establishment failed.
    Failed,
}

impl SessionState {
    /// Stable lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::CookieRestoreAttempted => "cookie_restore_attempted",
            Self::CredentialLoginAttempted => "credential_login_attempted",
            Self::ChallengePending => "challenge_pending",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-pacing delays used while authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Gap between typed characters.
    pub keystroke: JitterRange,
    /// Wait after a navigation before reading the location.
    pub settle: JitterRange,
    /// Wait after submitting credentials.
    pub post_submit: JitterRange,
    /// How often a pending challenge is re-checked.
    pub challenge_poll: Duration,
    /// How long a challenge may stay pending.
    pub challenge_ceiling: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            keystroke: JitterRange::millis(100, 300),
            settle: JitterRange::secs(2, 4),
            post_submit: JitterRange::secs(3, 5),
            challenge_poll: Duration::from_secs(2),
            challenge_ceiling: Duration::from_secs(300),
        }
    }
}

impl SessionTiming {
    /// No pacing delays; challenge polling keeps its defaults.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            keystroke: JitterRange::ZERO,
            settle: JitterRange::ZERO,
            post_submit: JitterRange::ZERO,
            ..Self::default()
        }
    }
}

/// Establishes an authenticated session on a browser handle.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Brings `handle` to an authenticated state.
    ///
    /// Returns `Success(())`, a retryable or fatal failure, or
    /// `ChallengeTimeout`.
    async fn establish(&self, handle: &mut dyn BrowserHandle) -> AttemptOutcome<()>;
}

/// Cookie-restore-then-login session manager for one account.
///
/// Not reentrant: concurrent `establish` calls queue on an internal lock.
pub struct SessionManager {
    account: String,
    credential: Option<Credential>,
    site: SiteProfile,
    store: Arc<dyn SessionStore>,
    timing: SessionTiming,
    state: Mutex<SessionState>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("account", &self.account)
            .field("credential", &self.credential)
            .field("site", &self.site.base_url)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager for `account`.
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        credential: Option<Credential>,
        site: SiteProfile,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            account: account.into(),
            credential,
            site,
            store,
            timing: SessionTiming::default(),
            state: Mutex::new(SessionState::NoSession),
        }
    }

    /// Replaces the pacing delays.
    #[must_use]
    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Account this manager authenticates.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// State reached by the most recent establishment.
    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Seeds stored cookies and checks whether the site accepts them.
    async fn restore(
        &self,
        handle: &mut dyn BrowserHandle,
        state: &mut SessionState,
    ) -> Result<bool, BrowserError> {
        let token = match self.store.load(&self.account) {
            Ok(Some(token)) if !token.cookies.is_empty() => token,
            Ok(_) => {
                debug!("no stored session token");
                return Ok(false);
            }
            Err(e) => {
                warn!(error = %e, "stored session token unreadable; falling back to credential login");
                return Ok(false);
            }
        };

        transition(state, SessionState::CookieRestoreAttempted);
        handle.navigate(&self.site.base_url).await?;
        handle.add_cookies(&token.cookies).await?;
        handle.navigate(&self.site.authenticated_url).await?;
        self.timing.settle.pause().await;

        let location = handle.current_url().await?;
        if self.site.is_authenticated(&location) {
            info!(cookies = token.cookies.len(), "session restored from stored cookies");
            return Ok(true);
        }

        info!(%location, "stored session rejected; discarding token");
        if let Err(e) = self.store.clear(&self.account) {
            warn!(error = %e, "failed to discard rejected session token");
        }
        Ok(false)
    }

    async fn login(
        &self,
        handle: &mut dyn BrowserHandle,
        state: &mut SessionState,
    ) -> Result<AttemptOutcome<()>, BrowserError> {
        let Some(credential) = &self.credential else {
            transition(state, SessionState::Failed);
            error!("credential login required but no credentials are configured");
            return Ok(AttemptOutcome::FatalFailure(
                CREDENTIALS_NOT_CONFIGURED.to_string(),
            ));
        };

        transition(state, SessionState::CredentialLoginAttempted);
        handle.navigate(&self.site.login_url).await?;
        self.timing.settle.pause().await;

        let location = handle.current_url().await?;
        if self.site.is_challenge(&location) {
            return self.await_challenge(handle, state, &location).await;
        }
        // Some sessions are bounced straight to the landing page.
        if self.site.is_authenticated(&location) {
            self.persist(handle).await;
            transition(state, SessionState::Authenticated);
            return Ok(AttemptOutcome::Success(()));
        }

        self.type_slowly(handle, &self.site.identifier_selector, credential.identifier())
            .await?;
        self.type_slowly(handle, &self.site.secret_selector, credential.secret())
            .await?;
        handle.submit(&self.site.submit_selector).await?;
        self.timing.post_submit.pause().await;

        let location = handle.current_url().await?;
        if self.site.is_challenge(&location) {
            return self.await_challenge(handle, state, &location).await;
        }
        if self.site.is_authenticated(&location) {
            info!("credential login succeeded");
            self.persist(handle).await;
            transition(state, SessionState::Authenticated);
            return Ok(AttemptOutcome::Success(()));
        }

        transition(state, SessionState::Failed);
        warn!(%location, "credential login landed on an unexpected location");
        Ok(AttemptOutcome::FatalFailure(format!(
            "unexpected location after login: {location}"
        )))
    }

    async fn await_challenge(
        &self,
        handle: &mut dyn BrowserHandle,
        state: &mut SessionState,
        location: &str,
    ) -> Result<AttemptOutcome<()>, BrowserError> {
        transition(state, SessionState::ChallengePending);
        warn!(
            %location,
            ceiling_secs = self.timing.challenge_ceiling.as_secs(),
            "verification challenge shown; complete it in the browser session to continue"
        );

        let deadline = Instant::now() + self.timing.challenge_ceiling;
        loop {
            tokio::time::sleep(self.timing.challenge_poll).await;
            match handle.current_url().await {
                Ok(current) if self.site.is_authenticated(&current) => {
                    info!("verification challenge resolved");
                    self.persist(handle).await;
                    transition(state, SessionState::Authenticated);
                    return Ok(AttemptOutcome::Success(()));
                }
                Ok(_) => {}
                Err(BrowserError::Closed) => return Err(BrowserError::Closed),
                Err(e) => debug!(error = %e, "challenge poll failed"),
            }

            if Instant::now() >= deadline {
                transition(state, SessionState::Failed);
                error!("verification challenge not completed before the deadline");
                return Ok(AttemptOutcome::ChallengeTimeout);
            }
        }
    }

    async fn type_slowly(
        &self,
        handle: &mut dyn BrowserHandle,
        selector: &str,
        text: &str,
    ) -> Result<(), BrowserError> {
        for ch in text.chars() {
            handle.type_char(selector, ch).await?;
            self.timing.keystroke.pause().await;
        }
        Ok(())
    }

    async fn persist(&self, handle: &mut dyn BrowserHandle) {
        let cookies = match handle.cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(error = %e, "could not read session cookies; token not saved");
                return;
            }
        };
        if cookies.is_empty() {
            warn!("authenticated handle exposed no cookies; token not saved");
            return;
        }

        let token = SessionToken::new(self.account.clone(), cookies);
        match self.store.save(&token) {
            Ok(()) => debug!(cookies = token.cookies.len(), "session token saved"),
            Err(e) => warn!(error = %e, "failed to save session token"),
        }
    }
}

#[async_trait]
impl Authenticator for SessionManager {
    #[instrument(skip(self, handle), fields(account = %self.account))]
    async fn establish(&self, handle: &mut dyn BrowserHandle) -> AttemptOutcome<()> {
        let mut state = self.state.lock().await;
        *state = SessionState::NoSession;

        let result = match self.restore(handle, &mut state).await {
            Ok(true) => {
                transition(&mut state, SessionState::Authenticated);
                Ok(AttemptOutcome::Success(()))
            }
            Ok(false) => self.login(handle, &mut state).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            transition(&mut state, SessionState::Failed);
            warn!(error = %e, "session establishment failed");
            AttemptOutcome::from_browser_error(&e)
        })
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    debug!(from = %state, to = %next, "session state");
    *state = next;
}
