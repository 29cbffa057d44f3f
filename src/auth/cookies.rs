//! Cookie records shared by session tokens, cookie import and the HTTP browser.
//!
//! Cookies travel through the crate as [`CookieLine`] values: they are parsed from
//! Netscape cookie exports, persisted inside encrypted session tokens, seeded into a
//! `reqwest` cookie jar when a session is restored, and exported back out of the jar
//! after a successful login.

use std::fmt;
use std::io::BufRead;
use std::time::{Duration, UNIX_EPOCH};

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, instrument, warn};
use url::Url;

/// A single cookie in Netscape field order.
///
/// The value is redacted from `Debug` output so cookies can appear in
/// structured logs without leaking session material.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieLine {
    /// Domain the cookie belongs to (e.g., `.example.com`).
    pub domain: String,
    /// Whether subdomains of `domain` also receive the cookie.
    pub tailmatch: bool,
    /// URL path scope.
    pub path: String,
    /// Whether the cookie is restricted to HTTPS.
    pub secure: bool,
    /// Unix expiry timestamp (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    value: String,
}

impl CookieLine {
    /// Creates a new cookie entry.
    #[must_use]
    pub fn new(
        domain: String,
        tailmatch: bool,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            tailmatch,
            path,
            secure,
            expires,
            name,
            value,
        }
    }

    /// Creates a host-only session cookie scoped to `/`.
    #[must_use]
    pub fn host_only(host: &str, secure: bool, name: &str, value: &str) -> Self {
        Self::new(
            host.to_string(),
            false,
            "/".to_string(),
            secure,
            0,
            name.to_string(),
            value.to_string(),
        )
    }

    /// Returns the cookie value. Never log it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for CookieLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieLine")
            .field("domain", &self.domain)
            .field("tailmatch", &self.tailmatch)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors raised while parsing a Netscape cookie export.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A data line could not be parsed.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number.
        line_number: usize,
        /// The offending line with its value field redacted.
        content: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Reading the input failed.
    #[error("failed to read cookie input: {0}")]
    Io(#[from] std::io::Error),

    /// The input had data lines but none of them parsed.
    #[error("no valid cookies found ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines.
        malformed_count: usize,
    },
}

impl CookieError {
    fn invalid(line_number: usize, line: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLine {
            line_number,
            content: redact_value_field(line),
            reason: reason.into(),
        }
    }
}

/// Cookies parsed from a Netscape export plus per-line warnings.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<CookieLine>,
    /// Malformed lines as `(line_number, reason)`.
    pub warnings: Vec<(usize, String)>,
}

/// Parses Netscape cookie-file content.
///
/// Data lines carry seven TAB-separated fields:
/// `domain`, `tailmatch`, `path`, `secure`, `expires`, `name`, `value`.
/// Comments (`#...`) and blank lines are ignored. Malformed lines become
/// warnings so a partially damaged export still yields its good cookies.
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when data lines exist but none parse.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut data_lines = 0_usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        data_lines += 1;

        match parse_data_line(line, line_number) {
            Ok(cookie) => {
                debug!(line = line_number, domain = %cookie.domain, name = %cookie.name, "parsed cookie");
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && data_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

fn parse_data_line(line: &str, line_number: usize) -> Result<CookieLine, CookieError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [domain, tailmatch, path, secure, expires, name, value] = fields.as_slice() else {
        return Err(CookieError::invalid(
            line_number,
            line,
            format!("expected 7 TAB-separated fields, found {}", fields.len()),
        ));
    };

    if domain.is_empty() {
        return Err(CookieError::invalid(line_number, line, "domain field is empty"));
    }
    if name.is_empty() {
        return Err(CookieError::invalid(line_number, line, "cookie name field is empty"));
    }

    let tailmatch = parse_flag(tailmatch, "tailmatch", line_number, line)?;
    let secure = parse_flag(secure, "secure", line_number, line)?;
    let expires = expires.parse::<u64>().map_err(|_| {
        CookieError::invalid(
            line_number,
            line,
            format!("expires field must be a non-negative integer, got '{expires}'"),
        )
    })?;

    Ok(CookieLine::new(
        (*domain).to_string(),
        tailmatch,
        (*path).to_string(),
        secure,
        expires,
        (*name).to_string(),
        (*value).to_string(),
    ))
}

fn parse_flag(value: &str, field: &str, line_number: usize, line: &str) -> Result<bool, CookieError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(CookieError::invalid(
            line_number,
            line,
            format!("{field} field must be TRUE or FALSE, got '{value}'"),
        )),
    }
}

fn redact_value_field(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        format!("{}\t[REDACTED]", fields[..6].join("\t"))
    } else {
        line.to_string()
    }
}

/// Adds cookies to an existing jar, returning how many were accepted.
///
/// Cookies with `tailmatch = false` are added host-only (no `Domain`
/// attribute) so they also match hosts that are IP literals.
#[instrument(level = "debug", skip(jar, cookies), fields(count = cookies.len()))]
pub fn seed_jar(jar: &Jar, cookies: &[CookieLine]) -> usize {
    let mut seeded = 0;
    for cookie in cookies {
        let Ok(origin) = origin_url(cookie).parse::<Url>() else {
            warn!(domain = %cookie.domain, name = %cookie.name, "skipping cookie with unparseable domain");
            continue;
        };
        jar.add_cookie_str(&set_cookie_header(cookie), &origin);
        seeded += 1;
    }
    seeded
}

/// Reads back the cookies the jar would send to `url`.
///
/// The jar only exposes `name=value` pairs, so exported cookies are host-only
/// session cookies for `url`'s host.
#[must_use]
pub fn export_jar(jar: &Jar, url: &Url) -> Vec<CookieLine> {
    let Some(host) = url.host_str() else {
        return Vec::new();
    };
    let secure = url.scheme() == "https";
    let Some(header) = jar.cookies(url) else {
        return Vec::new();
    };
    let Ok(header) = header.to_str() else {
        warn!(host, "cookie header is not valid ASCII; nothing exported");
        return Vec::new();
    };

    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (!name.is_empty()).then(|| CookieLine::host_only(host, secure, name, value))
        })
        .collect()
}

fn set_cookie_header(cookie: &CookieLine) -> String {
    let mut parts = vec![format!("{}={}", cookie.name, cookie.value())];
    if cookie.tailmatch {
        parts.push(format!("Domain={}", cookie.domain));
    }
    parts.push(format!("Path={}", cookie.path));
    if cookie.secure {
        parts.push("Secure".to_string());
    }
    if cookie.expires > 0 {
        match http_date(cookie.expires) {
            Some(expires) => parts.push(format!("Expires={expires}")),
            None => warn!(
                name = %cookie.name,
                expires = cookie.expires,
                "cookie expiry overflows SystemTime; treating as session cookie"
            ),
        }
    }
    parts.join("; ")
}

fn origin_url(cookie: &CookieLine) -> String {
    let scheme = if cookie.secure { "https" } else { "http" };
    let host = cookie.domain.trim_start_matches('.');
    format!("{scheme}://{host}{}", cookie.path)
}

fn http_date(timestamp: u64) -> Option<String> {
    let time = UNIX_EPOCH.checked_add(Duration::from_secs(timestamp))?;
    Some(httpdate::fmt_http_date(time))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn cursor(s: &str) -> Cursor<&[u8]> {
        Cursor::new(s.as_bytes())
    }

    // ==================== Netscape Parsing Tests ====================

    #[test]
    fn test_parse_netscape_cookies_reads_all_fields() {
        let input = "# Netscape HTTP Cookie File\n\
                     .linkedin.com\tTRUE\t/\tTRUE\t4102444800\tli_at\tAQEDAR\n\
                     www.linkedin.com\tFALSE\t/feed\tFALSE\t0\tJSESSIONID\tajax:123\n";
        let result = parse_netscape_cookies(cursor(input)).unwrap();

        assert_eq!(result.cookies.len(), 2);
        assert!(result.warnings.is_empty());
        let first = &result.cookies[0];
        assert_eq!(first.domain, ".linkedin.com");
        assert!(first.tailmatch);
        assert!(first.secure);
        assert_eq!(first.expires, 4_102_444_800);
        assert_eq!(first.name, "li_at");
        assert_eq!(first.value(), "AQEDAR");
        assert_eq!(result.cookies[1].path, "/feed");
    }

    #[test]
    fn test_parse_netscape_cookies_keeps_good_lines_and_warns() {
        let input = "bad line\n.example.com\tTRUE\t/\tFALSE\t0\tsid\tv\n.example.com\tMAYBE\t/\tFALSE\t0\tx\ty\n";
        let result = parse_netscape_cookies(cursor(input)).unwrap();

        assert_eq!(result.cookies.len(), 1);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].0, 1);
        assert!(result.warnings[1].1.contains("tailmatch"));
    }

    #[test]
    fn test_parse_netscape_cookies_only_comments_is_empty_ok() {
        let result = parse_netscape_cookies(cursor("# comment\n\n")).unwrap();
        assert!(result.cookies.is_empty());
    }

    #[test]
    fn test_parse_netscape_cookies_all_malformed_is_error() {
        let err = parse_netscape_cookies(cursor("nope\nstill nope\n")).unwrap_err();
        assert!(matches!(err, CookieError::NoCookiesFound { malformed_count: 2 }));
    }

    #[test]
    fn test_parse_netscape_cookies_crlf_and_bad_expiry() {
        let input = ".a.com\tTRUE\t/\tFALSE\t0\tok\tv\r\n.a.com\tTRUE\t/\tFALSE\tsoon\tbad\tv\r\n";
        let result = parse_netscape_cookies(cursor(input)).unwrap();
        assert_eq!(result.cookies.len(), 1);
        assert_eq!(result.cookies[0].value(), "v");
        assert!(result.warnings[0].1.contains("expires"));
    }

    #[test]
    fn test_invalid_line_error_redacts_value() {
        let input = ".a.com\tTRUE\t/\tFALSE\tx\tsid\ttop-secret\n";
        let err = parse_netscape_cookies(cursor(input)).unwrap_err();
        assert!(matches!(err, CookieError::NoCookiesFound { .. }));

        let line_err = parse_data_line(input.trim_end(), 1).unwrap_err();
        let rendered = line_err.to_string();
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_cookie_line_debug_redacts_value() {
        let cookie = CookieLine::host_only("example.com", true, "sid", "hunter2");
        let debug = format!("{cookie:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("sid"));
    }

    // ==================== Jar Tests ====================

    #[test]
    fn test_seed_jar_tailmatch_cookie_reaches_subdomain() {
        let jar = Jar::default();
        let cookie = CookieLine::new(
            ".example.com".to_string(),
            true,
            "/".to_string(),
            false,
            0,
            "sid".to_string(),
            "abc".to_string(),
        );
        assert_eq!(seed_jar(&jar, &[cookie]), 1);

        let url = Url::parse("http://www.example.com/feed/").unwrap();
        let header = jar.cookies(&url).unwrap();
        assert!(header.to_str().unwrap().contains("sid=abc"));
    }

    #[test]
    fn test_seed_jar_host_only_cookie_matches_ip_host_with_port() {
        let jar = Jar::default();
        seed_jar(&jar, &[CookieLine::host_only("127.0.0.1", false, "li_at", "tok")]);

        let url = Url::parse("http://127.0.0.1:43123/feed/").unwrap();
        let header = jar.cookies(&url).unwrap();
        assert_eq!(header.to_str().unwrap(), "li_at=tok");
    }

    #[test]
    fn test_seed_jar_secure_cookie_not_sent_over_http() {
        let jar = Jar::default();
        seed_jar(&jar, &[CookieLine::host_only("example.com", true, "sid", "v")]);

        let http = Url::parse("http://example.com/").unwrap();
        let https = Url::parse("https://example.com/").unwrap();
        assert!(jar.cookies(&http).is_none());
        assert!(jar.cookies(&https).is_some());
    }

    #[test]
    fn test_export_jar_returns_host_only_cookies() {
        let jar = Jar::default();
        let url = Url::parse("https://www.example.com/feed/").unwrap();
        jar.add_cookie_str("a=1; Path=/", &url);
        jar.add_cookie_str("b=2; Path=/", &url);

        let mut exported = export_jar(&jar, &url);
        exported.sort_by(|l, r| l.name.cmp(&r.name));

        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].domain, "www.example.com");
        assert!(!exported[0].tailmatch);
        assert!(exported[0].secure);
        assert_eq!(exported[1].value(), "2");
    }

    #[test]
    fn test_export_jar_empty_jar() {
        let jar = Jar::default();
        let url = Url::parse("https://example.com/").unwrap();
        assert!(export_jar(&jar, &url).is_empty());
    }

    #[test]
    fn test_set_cookie_header_attributes() {
        let session = CookieLine::host_only("example.com", false, "sid", "v");
        assert_eq!(set_cookie_header(&session), "sid=v; Path=/");

        let persistent = CookieLine::new(
            ".example.com".to_string(),
            true,
            "/".to_string(),
            true,
            1_700_000_000,
            "li_at".to_string(),
            "x".to_string(),
        );
        let header = set_cookie_header(&persistent);
        assert!(header.contains("Domain=.example.com"));
        assert!(header.contains("Secure"));
        assert!(header.contains("Expires=Tue, 14 Nov 2023 22:13:20 GMT"));
    }
}
