//! Parsing of operator-supplied cookie exports for `session import`.
//!
//! Accepts the Netscape cookie-file format and the JSON shapes produced by
//! common browser extensions (a bare array or `{ "cookies": [...] }`). Imported
//! cookies seed a session token so the next batch can restore an existing
//! authenticated session instead of driving a credential login.

use std::collections::HashSet;
use std::io::BufReader;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::instrument;

use super::{CookieError, CookieLine, parse_netscape_cookies};

/// Detected export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Netscape HTTP cookie file.
    Netscape,
    /// Browser-extension JSON export.
    Json,
}

/// Cookies that survived parsing and validation.
#[derive(Debug)]
pub struct ImportedCookies {
    /// Valid, unexpired cookies.
    pub cookies: Vec<CookieLine>,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<String>,
    /// Format the input was parsed as.
    pub format: ImportFormat,
}

/// Errors from [`parse_cookie_import`].
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Input was blank.
    #[error("cookie input is empty")]
    EmptyInput,
    /// Netscape parsing failed.
    #[error(transparent)]
    Netscape(#[from] CookieError),
    /// JSON parsing failed.
    #[error("invalid cookie JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Every cookie was rejected.
    #[error("no valid cookies found after validation")]
    NoValidCookies,
}

/// Parses and validates a cookie export in either supported format.
///
/// Expired cookies and cookies with an empty domain, name or value are dropped
/// with a warning.
///
/// # Errors
///
/// Returns [`ImportError`] when the input is empty, unparseable, or nothing
/// valid remains.
#[instrument(level = "debug", skip(input))]
pub fn parse_cookie_import(input: &str) -> Result<ImportedCookies, ImportError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ImportError::EmptyInput);
    }

    let (cookies, mut warnings, format) = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let (cookies, warnings) = parse_json_export(trimmed)?;
        (cookies, warnings, ImportFormat::Json)
    } else {
        let parsed = parse_netscape_cookies(BufReader::new(trimmed.as_bytes()))?;
        let warnings = parsed
            .warnings
            .iter()
            .map(|(line, reason)| format!("line {line}: {reason}"))
            .collect();
        (parsed.cookies, warnings, ImportFormat::Netscape)
    };

    let (cookies, rejected) = validate(cookies, unix_now());
    warnings.extend(rejected);
    if cookies.is_empty() {
        return Err(ImportError::NoValidCookies);
    }

    Ok(ImportedCookies {
        cookies,
        warnings,
        format,
    })
}

/// Keeps only cookies a browser would send to `host`.
#[must_use]
pub fn cookies_for_host(cookies: Vec<CookieLine>, host: &str) -> Vec<CookieLine> {
    cookies
        .into_iter()
        .filter(|cookie| {
            let domain = cookie.domain.trim_start_matches('.');
            host == domain || (cookie.tailmatch && host.ends_with(&format!(".{domain}")))
        })
        .collect()
}

/// Counts distinct domains, ignoring a leading dot.
#[must_use]
pub fn unique_domain_count(cookies: &[CookieLine]) -> usize {
    cookies
        .iter()
        .map(|cookie| cookie.domain.trim_start_matches('.'))
        .collect::<HashSet<_>>()
        .len()
}

fn validate(cookies: Vec<CookieLine>, now: u64) -> (Vec<CookieLine>, Vec<String>) {
    let mut valid = Vec::with_capacity(cookies.len());
    let mut warnings = Vec::new();

    for mut cookie in cookies {
        if cookie.domain.trim().is_empty() || cookie.name.trim().is_empty() {
            warnings.push("skipped cookie with empty domain or name".to_string());
            continue;
        }
        if cookie.value().is_empty() {
            warnings.push(format!("skipped cookie '{}' with empty value", cookie.name));
            continue;
        }
        if cookie.expires > 0 && cookie.expires <= now {
            warnings.push(format!(
                "skipped expired cookie '{}' for domain '{}'",
                cookie.name, cookie.domain
            ));
            continue;
        }
        if cookie.path.trim().is_empty() {
            cookie.path = "/".to_string();
        }
        valid.push(cookie);
    }

    (valid, warnings)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn parse_json_export(input: &str) -> Result<(Vec<CookieLine>, Vec<String>), ImportError> {
    let entries = match serde_json::from_str::<JsonExport>(input)? {
        JsonExport::Array(entries) | JsonExport::Wrapped { cookies: entries } => entries,
    };

    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match entry.into_cookie() {
            Ok(cookie) => cookies.push(cookie),
            Err(reason) => warnings.push(format!("entry {}: {reason}", index + 1)),
        }
    }
    Ok((cookies, warnings))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonExport {
    Array(Vec<JsonCookie>),
    Wrapped { cookies: Vec<JsonCookie> },
}

#[derive(Debug, Deserialize)]
struct JsonCookie {
    domain: Option<String>,
    host: Option<String>,
    #[serde(rename = "hostOnly")]
    host_only: Option<bool>,
    path: Option<String>,
    secure: Option<bool>,
    name: Option<String>,
    value: Option<String>,
    #[serde(rename = "expirationDate")]
    expiration_date: Option<f64>,
    expires: Option<f64>,
}

impl JsonCookie {
    fn into_cookie(self) -> Result<CookieLine, String> {
        let raw_domain = self.domain.or(self.host).unwrap_or_default();
        let without_scheme = raw_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let host = without_scheme.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err("missing required field: domain".to_string());
        }

        let tailmatch = self.host_only.map_or_else(|| host.starts_with('.'), |only| !only);
        let bare = host.trim_start_matches('.');
        let domain = if tailmatch { format!(".{bare}") } else { bare.to_string() };

        let name = self.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err("missing required field: name".to_string());
        }
        let value = self.value.unwrap_or_default();
        if value.is_empty() {
            return Err(format!("cookie '{name}' has empty value"));
        }

        let path = match self.path {
            Some(path) if path.starts_with('/') => path,
            Some(path) if !path.trim().is_empty() => format!("/{path}"),
            _ => "/".to_string(),
        };
        let expires = self.expiration_date.or(self.expires).map_or(0, whole_seconds);

        Ok(CookieLine::new(
            domain,
            tailmatch,
            path,
            self.secure.unwrap_or(false),
            expires,
            name,
            value,
        ))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    // `as` saturates at u64::MAX for out-of-range floats.
    raw.floor() as u64
}
