//! Session command handlers: import, inspect and clear the stored token.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow, bail};
use joblo_core::auth::{
    ImportFormat, SessionStore, SessionToken, cookies_for_host, parse_cookie_import,
    unique_domain_count,
};
use joblo_core::{Settings, SiteProfile};
use tracing::{info, warn};
use url::Url;

use crate::app::runtime::open_session_store;

pub fn run_session_import_command(source: Option<&Path>) -> Result<()> {
    let settings = Settings::from_env()?;
    let site = SiteProfile::linkedin();

    let raw_input = read_import_input(source)?;
    let parsed =
        parse_cookie_import(&raw_input).map_err(|error| anyhow!("Cookie import failed: {error}"))?;

    for warning in &parsed.warnings {
        warn!("{warning}");
    }

    let format_label = match parsed.format {
        ImportFormat::Netscape => "netscape",
        ImportFormat::Json => "json",
    };
    let domains = unique_domain_count(&parsed.cookies);
    let total = parsed.cookies.len();

    let host = Url::parse(&site.base_url)?
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Site URL has no host"))?;
    let cookies = cookies_for_host(parsed.cookies, &host);
    if cookies.is_empty() {
        bail!("None of the {total} imported cookies apply to {host}");
    }

    info!(
        format = format_label,
        cookies = total,
        domains,
        kept = cookies.len(),
        "Cookie import validation complete"
    );

    let store = open_session_store(&settings)?;
    let account = settings.account();
    store
        .save(&SessionToken::new(account, cookies))
        .map_err(|error| anyhow!("Failed to persist session token securely: {error}"))?;
    info!(
        account,
        path = %store.token_path(account).display(),
        "Saved encrypted session token"
    );

    Ok(())
}

pub fn run_session_status_command() -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_session_store(&settings)?;
    let account = settings.account();

    match store.load(account) {
        Ok(Some(token)) => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_secs());
            let age_hours = now.saturating_sub(token.captured_at) / 3600;
            info!(
                account,
                cookies = token.cookies.len(),
                age_hours,
                "Stored session token found"
            );
        }
        Ok(None) => info!(account, "No stored session token"),
        Err(error) => warn!(account, %error, "Stored session token is unreadable"),
    }

    Ok(())
}

pub fn run_session_clear_command() -> Result<()> {
    let settings = Settings::from_env()?;
    let store = open_session_store(&settings)?;
    let account = settings.account();

    let removed = store
        .clear(account)
        .map_err(|error| anyhow!("Failed to clear session token: {error}"))?;

    if removed {
        info!(account, path = %store.token_path(account).display(), "Cleared session token");
    } else {
        info!(account, "No session token found");
    }

    Ok(())
}

fn read_import_input(source: Option<&Path>) -> Result<String> {
    if let Some(path) = source.filter(|path| *path != Path::new("-")) {
        return fs::read_to_string(path)
            .map_err(|error| anyhow!("Cannot read cookie file '{}': {}", path.display(), error));
    }

    if io::stdin().is_terminal() {
        info!("Export cookies from a logged-in browser (Netscape cookies.txt or JSON),");
        info!("then paste them here and press Ctrl-D.");
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        bail!("No cookie data provided on stdin");
    }
    Ok(buffer)
}
