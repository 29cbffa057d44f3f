//! HTTP-backed browser handle.
//!
//! [`HttpBrowser`] drives sites with plain HTTP requests: navigation is a GET
//! that follows redirects, the current location is the final URL, cookies live
//! in a `reqwest` jar, typed characters are buffered per field and `submit`
//! posts the enclosing form (hidden inputs included). It cannot run scripts,
//! so interactive verification challenges can only be completed out of band.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, RequestBuilder};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use super::{BrowserError, BrowserHandle, BrowserLauncher};
use crate::auth::{CookieLine, export_jar, seed_jar};
use crate::proxy::ProxyEndpoint;
use crate::user_agent;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// Launches [`HttpBrowser`] handles.
#[derive(Debug, Clone)]
pub struct HttpBrowserLauncher {
    connect_timeout: Duration,
    page_timeout: Duration,
}

impl Default for HttpBrowserLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_PAGE_TIMEOUT)
    }
}

impl HttpBrowserLauncher {
    /// Creates a launcher with explicit timeouts.
    #[must_use]
    pub fn new(connect_timeout: Duration, page_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            page_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for HttpBrowserLauncher {
    async fn launch(
        &self,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<Box<dyn BrowserHandle>, BrowserError> {
        let handle = HttpBrowser::new(proxy, self.connect_timeout, self.page_timeout)?;
        Ok(Box::new(handle))
    }
}

struct TypedField {
    selector: String,
    name: String,
    value: String,
}

impl fmt::Debug for TypedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedField")
            .field("selector", &self.selector)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// A browser handle that speaks HTTP directly.
#[derive(Debug)]
pub struct HttpBrowser {
    client: Client,
    jar: Arc<Jar>,
    location: Option<Url>,
    page: Option<String>,
    typed: Vec<TypedField>,
    closed: bool,
}

impl HttpBrowser {
    /// Creates a handle with its own cookie jar, optionally routed through `proxy`.
    ///
    /// Without a proxy the handle connects directly, ignoring proxy settings
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] if the proxy address is unusable or the
    /// client cannot be built.
    #[instrument(level = "debug", skip_all, fields(proxy = proxy.map(|p| p.address.as_str())))]
    pub fn new(
        proxy: Option<&ProxyEndpoint>,
        connect_timeout: Duration,
        page_timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let jar = Arc::new(Jar::default());
        let builder = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(user_agent::random_browser_user_agent())
            .connect_timeout(connect_timeout)
            .timeout(page_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true);

        let builder = match proxy {
            Some(endpoint) => {
                let route = Proxy::all(endpoint.proxy_url())
                    .map_err(|e| BrowserError::launch(format!("invalid proxy {}: {e}", endpoint.address)))?;
                builder.proxy(route)
            }
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| BrowserError::launch(e.to_string()))?;

        Ok(Self {
            client,
            jar,
            location: None,
            page: None,
            typed: Vec::new(),
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    fn html(&self) -> &str {
        self.page.as_deref().unwrap_or_default()
    }

    async fn load(&mut self, request: RequestBuilder, url: &str) -> Result<(), BrowserError> {
        let response = request
            .send()
            .await
            .map_err(|e| BrowserError::from_reqwest(url, e))?;
        let status = response.status();
        let landed = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| BrowserError::from_reqwest(landed.as_str(), e))?;

        debug!(url = %landed, status = status.as_u16(), bytes = body.len(), "page loaded");
        self.location = Some(landed.clone());
        self.page = Some(body);
        self.typed.clear();

        if status.is_success() {
            Ok(())
        } else {
            Err(BrowserError::http_status(landed.as_str(), status.as_u16()))
        }
    }
}

#[async_trait]
impl BrowserHandle for HttpBrowser {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let target = match &self.location {
            Some(base) => base.join(url),
            None => Url::parse(url),
        }
        .map_err(|_| BrowserError::invalid_url(url))?;

        let request = self.client.get(target);
        self.load(request, url).await
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        self.ensure_open()?;
        Ok(self
            .location
            .as_ref()
            .map_or_else(|| "about:blank".to_string(), Url::to_string))
    }

    async fn cookies(&mut self) -> Result<Vec<CookieLine>, BrowserError> {
        self.ensure_open()?;
        Ok(self
            .location
            .as_ref()
            .map(|url| export_jar(&self.jar, url))
            .unwrap_or_default())
    }

    async fn add_cookies(&mut self, cookies: &[CookieLine]) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let seeded = seed_jar(&self.jar, cookies);
        debug!(seeded, offered = cookies.len(), "cookies added to handle");
        Ok(())
    }

    async fn type_char(&mut self, selector: &str, ch: char) -> Result<(), BrowserError> {
        self.ensure_open()?;
        if let Some(field) = self.typed.iter_mut().find(|f| f.selector == selector) {
            field.value.push(ch);
            return Ok(());
        }

        let name = field_name(self.html(), selector)?;
        self.typed.push(TypedField {
            selector: selector.to_string(),
            name,
            value: ch.to_string(),
        });
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn submit(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let base = self
            .location
            .clone()
            .ok_or_else(|| BrowserError::element_not_found(selector))?;
        let submission = build_submission(self.html(), &base, selector, &self.typed)?;
        debug!(action = %submission.action, post = submission.post, fields = submission.fields.len(), "submitting form");

        let request = if submission.post {
            self.client
                .post(submission.action.clone())
                .form(&submission.fields)
        } else {
            let mut action = submission.action.clone();
            action
                .query_pairs_mut()
                .extend_pairs(submission.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            self.client.get(action)
        };
        self.load(request, submission.action.as_str()).await
    }

    async fn select_texts(&mut self, selector: &str) -> Result<Vec<String>, BrowserError> {
        self.ensure_open()?;
        select_texts(self.html(), selector)
    }

    async fn select_attrs(
        &mut self,
        selector: &str,
        attr: &str,
    ) -> Result<Vec<String>, BrowserError> {
        self.ensure_open()?;
        select_attrs(self.html(), selector, attr)
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.page = None;
            self.typed.clear();
            debug!("browser handle closed");
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Submission {
    action: Url,
    post: bool,
    fields: Vec<(String, String)>,
}

fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|_| BrowserError::invalid_selector(selector))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn select_texts(html: &str, selector: &str) -> Result<Vec<String>, BrowserError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&parsed)
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .collect())
}

fn select_attrs(html: &str, selector: &str, attr: &str) -> Result<Vec<String>, BrowserError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&parsed)
        .filter_map(|el| el.value().attr(attr).map(str::to_string))
        .collect())
}

fn field_name(html: &str, selector: &str) -> Result<String, BrowserError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let field = document
        .select(&parsed)
        .next()
        .ok_or_else(|| BrowserError::element_not_found(selector))?;
    let attrs = field.value();
    Ok(attrs
        .attr("name")
        .or_else(|| attrs.attr("id"))
        .unwrap_or_default()
        .to_string())
}

fn build_submission(
    html: &str,
    base: &Url,
    submit_selector: &str,
    typed: &[TypedField],
) -> Result<Submission, BrowserError> {
    let document = Html::parse_document(html);
    let control = document
        .select(&parse_selector(submit_selector)?)
        .next()
        .ok_or_else(|| BrowserError::element_not_found(submit_selector))?;
    let form = control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form")
        .ok_or_else(|| BrowserError::element_not_found(format!("form enclosing {submit_selector}")))?;

    let mut fields = Vec::new();
    for input in form.select(&parse_selector("input[name]")?) {
        let attrs = input.value();
        let Some(name) = attrs.attr("name") else {
            continue;
        };
        if typed.iter().any(|f| f.name == name) {
            continue;
        }
        let kind = attrs.attr("type").unwrap_or("text").to_ascii_lowercase();
        let unchecked = matches!(kind.as_str(), "checkbox" | "radio") && attrs.attr("checked").is_none();
        if unchecked || matches!(kind.as_str(), "submit" | "button" | "image" | "file" | "reset") {
            continue;
        }
        fields.push((name.to_string(), attrs.attr("value").unwrap_or_default().to_string()));
    }
    fields.extend(
        typed
            .iter()
            .filter(|f| !f.name.is_empty())
            .map(|f| (f.name.clone(), f.value.clone())),
    );
    if let Some(name) = control.value().attr("name") {
        let value = control.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }

    let action = match form.value().attr("action").filter(|a| !a.trim().is_empty()) {
        Some(action) => base
            .join(action)
            .map_err(|_| BrowserError::invalid_url(action))?,
        None => base.clone(),
    };
    let post = form
        .value()
        .attr("method")
        .is_some_and(|m| m.eq_ignore_ascii_case("post"));

    Ok(Submission {
        action,
        post,
        fields,
    })
}
