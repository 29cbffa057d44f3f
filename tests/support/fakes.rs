//! An in-process fake site and browser driver.
//!
//! [`FakeSite`] models the pieces of the target site the session manager and
//! scrapers care about: a login form, a challenge page, a cookie-gated feed
//! and a set of content pages. [`FakeLauncher`] hands out [`FakeHandle`]s
//! that browse it and records how they were launched and closed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use joblo_core::SiteProfile;
use joblo_core::auth::CookieLine;
use joblo_core::browser::{BrowserError, BrowserHandle, BrowserLauncher};
use joblo_core::proxy::{ProxyEndpoint, ProxyError, ProxyProbe};

pub const ORIGIN: &str = "https://fake.test";
pub const HOST: &str = "fake.test";
pub const IDENTIFIER: &str = "ops@example.com";
pub const SECRET: &str = "hunter2";
pub const SESSION_COOKIE: &str = "li_at";
pub const GOOD_SESSION: &str = "good-session";

/// What happens when the login form is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginBehavior {
    /// Correct credentials land on the feed.
    Succeed,
    /// The submit lands on a challenge that clears after this many location
    /// checks, or never when `None`.
    Challenge(Option<usize>),
    /// The login page itself shows a challenge that never clears.
    ChallengeOnLoginPage,
    /// The submit lands back on the login page.
    Reject,
}

/// A content page: texts and links keyed by CSS selector.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub texts: Vec<(String, String)>,
    pub links: Vec<(String, String)>,
    pub status: Option<u16>,
}

impl FakePage {
    pub fn text(mut self, selector: &str, text: &str) -> Self {
        self.texts.push((selector.to_string(), text.to_string()));
        self
    }

    pub fn link(mut self, selector: &str, href: &str) -> Self {
        self.links.push((selector.to_string(), href.to_string()));
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Shared site state and counters.
pub struct FakeSite {
    pub site: SiteProfile,
    pub login: Mutex<LoginBehavior>,
    pages: Mutex<HashMap<String, FakePage>>,
    /// Page loads that will time out before any succeeds.
    pub page_timeouts: AtomicUsize,
    /// When set, every content page redirects to the login wall.
    pub session_expired: AtomicBool,
    pub launches_failing: AtomicUsize,
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub submits: AtomicUsize,
    pub proxies: Mutex<Vec<Option<String>>>,
}

impl FakeSite {
    pub fn new(login: LoginBehavior) -> Arc<Self> {
        Arc::new(Self {
            site: SiteProfile::for_origin(ORIGIN),
            login: Mutex::new(login),
            pages: Mutex::new(HashMap::new()),
            page_timeouts: AtomicUsize::new(0),
            session_expired: AtomicBool::new(false),
            launches_failing: AtomicUsize::new(0),
            launches: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            proxies: Mutex::new(Vec::new()),
        })
    }

    pub fn page(&self, path: &str, page: FakePage) {
        self.pages
            .lock()
            .unwrap()
            .insert(format!("{ORIGIN}{path}"), page);
    }

    pub fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    pub fn launcher(self: &Arc<Self>) -> Arc<FakeLauncher> {
        Arc::new(FakeLauncher {
            site: Arc::clone(self),
        })
    }

    pub fn proxies_seen(&self) -> Vec<Option<String>> {
        self.proxies.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Option<FakePage> {
        self.pages.lock().unwrap().get(url).cloned()
    }

    fn challenge_url() -> String {
        format!("{ORIGIN}/checkpoint/challenge/")
    }
}

pub fn session_cookie(value: &str) -> CookieLine {
    CookieLine::host_only(HOST, true, SESSION_COOKIE, value)
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(
        &self,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Box<dyn BrowserHandle>, BrowserError> {
        self.site
            .proxies
            .lock()
            .unwrap()
            .push(proxy.map(|p| p.address.clone()));
        if self
            .site
            .launches_failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BrowserError::launch("fake launch failure"));
        }
        self.site.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle::new(Arc::clone(&self.site))))
    }
}

/// One browsing context on a [`FakeSite`].
pub struct FakeHandle {
    site: Arc<FakeSite>,
    location: String,
    page: Option<FakePage>,
    cookies: Vec<CookieLine>,
    typed: HashMap<String, String>,
    logged_in: bool,
    challenge_checks_left: Option<Option<usize>>,
    closed: bool,
}

impl FakeHandle {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            location: "about:blank".to_string(),
            page: None,
            cookies: Vec::new(),
            typed: HashMap::new(),
            logged_in: false,
            challenge_checks_left: None,
            closed: false,
        }
    }

    fn authorized(&self) -> bool {
        self.logged_in
            || self
                .cookies
                .iter()
                .any(|c| c.name == SESSION_COOKIE && c.value() == GOOD_SESSION)
    }

    fn land(&mut self, url: String) {
        self.location = url;
        self.page = None;
        self.typed.clear();
    }

    fn sign_in(&mut self) {
        self.logged_in = true;
        self.challenge_checks_left = None;
        self.cookies.push(session_cookie(GOOD_SESSION));
        self.land(self.site.site.authenticated_url.clone());
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserHandle for FakeHandle {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let profile = self.site.site.clone();

        if url == profile.base_url {
            self.land(url.to_string());
            return Ok(());
        }
        if url == profile.authenticated_url {
            let landed = if self.authorized() {
                url.to_string()
            } else {
                profile.login_url.clone()
            };
            self.land(landed);
            return Ok(());
        }
        if url == profile.login_url {
            let login = *self.site.login.lock().unwrap();
            if login == LoginBehavior::ChallengeOnLoginPage {
                self.challenge_checks_left = Some(None);
                self.land(FakeSite::challenge_url());
            } else if self.authorized() {
                self.land(profile.authenticated_url.clone());
            } else {
                self.land(url.to_string());
            }
            return Ok(());
        }

        if self
            .site
            .page_timeouts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BrowserError::Timeout {
                url: url.to_string(),
            });
        }
        if !self.authorized() || self.site.session_expired.load(Ordering::SeqCst) {
            self.land(format!("{ORIGIN}/authwall?sessionRedirect={url}"));
            return Ok(());
        }

        let page = self.site.lookup(url);
        self.land(url.to_string());
        match page {
            Some(page) => {
                let status = page.status;
                self.page = Some(page);
                match status {
                    Some(status) if !(200..300).contains(&status) => {
                        Err(BrowserError::http_status(url, status))
                    }
                    _ => Ok(()),
                }
            }
            None => Err(BrowserError::http_status(url, 404)),
        }
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        self.ensure_open()?;
        if let Some(Some(left)) = self.challenge_checks_left {
            if left == 0 {
                self.sign_in();
            } else {
                self.challenge_checks_left = Some(Some(left - 1));
            }
        }
        Ok(self.location.clone())
    }

    async fn cookies(&mut self) -> Result<Vec<CookieLine>, BrowserError> {
        self.ensure_open()?;
        Ok(self.cookies.clone())
    }

    async fn add_cookies(&mut self, cookies: &[CookieLine]) -> Result<(), BrowserError> {
        self.ensure_open()?;
        self.cookies.extend_from_slice(cookies);
        Ok(())
    }

    async fn type_char(&mut self, selector: &str, ch: char) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let profile = self.site.site.clone();
        let on_form = self.location == profile.login_url;
        if !on_form || (selector != profile.identifier_selector && selector != profile.secret_selector)
        {
            return Err(BrowserError::element_not_found(selector));
        }
        self.typed.entry(selector.to_string()).or_default().push(ch);
        Ok(())
    }

    async fn submit(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let profile = self.site.site.clone();
        if self.location != profile.login_url || selector != profile.submit_selector {
            return Err(BrowserError::element_not_found(selector));
        }
        self.site.submits.fetch_add(1, Ordering::SeqCst);

        let identifier = self.typed.get(&profile.identifier_selector).cloned();
        let secret = self.typed.get(&profile.secret_selector).cloned();
        let correct = identifier.as_deref() == Some(IDENTIFIER) && secret.as_deref() == Some(SECRET);
        let login = *self.site.login.lock().unwrap();

        match login {
            LoginBehavior::Succeed if correct => self.sign_in(),
            LoginBehavior::Challenge(checks) if correct => {
                self.challenge_checks_left = Some(checks);
                self.land(FakeSite::challenge_url());
            }
            _ => self.land(format!("{}?error=1", profile.login_url)),
        }
        Ok(())
    }

    async fn select_texts(&mut self, selector: &str) -> Result<Vec<String>, BrowserError> {
        self.ensure_open()?;
        Ok(self
            .page
            .iter()
            .flat_map(|page| page.texts.iter())
            .filter(|(s, _)| s == selector)
            .map(|(_, text)| text.clone())
            .collect())
    }

    async fn select_attrs(
        &mut self,
        selector: &str,
        attr: &str,
    ) -> Result<Vec<String>, BrowserError> {
        self.ensure_open()?;
        if attr != "href" {
            return Ok(Vec::new());
        }
        Ok(self
            .page
            .iter()
            .flat_map(|page| page.links.iter())
            .filter(|(s, _)| s == selector)
            .map(|(_, href)| href.clone())
            .collect())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.site.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Probe that accepts a fixed set of addresses.
pub struct AllowListProbe {
    healthy: Vec<String>,
    pub probes: AtomicUsize,
}

impl AllowListProbe {
    pub fn new(healthy: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            healthy: healthy.iter().map(|s| (*s).to_string()).collect(),
            probes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProxyProbe for AllowListProbe {
    async fn probe(&self, address: &str) -> Result<(), ProxyError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.healthy.iter().any(|h| h == address) {
            Ok(())
        } else {
            Err(ProxyError::BadStatus {
                address: address.to_string(),
                status: 503,
            })
        }
    }
}

/// A profile page whose name, headline and location all match.
pub fn profile_page(name: &str) -> FakePage {
    FakePage::default()
        .text("h1.text-heading-xlarge", name)
        .text(".text-body-medium.break-words", "Staff Engineer at Example")
        .text(".pv-text-details__left-panel .text-body-small", "Berlin, Germany")
}

/// A job posting page with title, company and location.
pub fn job_page(title: &str) -> FakePage {
    FakePage::default()
        .text(".jobs-unified-top-card__job-title", title)
        .text(".jobs-unified-top-card__company-name", "Example Corp")
        .text(".jobs-unified-top-card__bullet", "Remote, EU")
}
