//! Where the target site keeps its login form and how its locations read.

use url::Url;

const LINKEDIN_ORIGIN: &str = "https://www.linkedin.com";

/// Locations, selectors and location markers for one target site.
///
/// Every URL is derived from a single origin so tests can point the whole
/// profile at a local mock server with [`SiteProfile::for_origin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    /// Site root, visited before seeding cookies.
    pub base_url: String,
    /// Login form location.
    pub login_url: String,
    /// Landing page only an authenticated session reaches.
    pub authenticated_url: String,
    /// Job search endpoint.
    pub jobs_search_url: String,
    /// Identifier input.
    pub identifier_selector: String,
    /// Secret input.
    pub secret_selector: String,
    /// Login submit control.
    pub submit_selector: String,
    /// Location fragment that proves an authenticated session.
    pub authenticated_marker: String,
    /// Location fragments that mean a verification challenge is showing.
    pub challenge_markers: Vec<String>,
    /// Location fragments that mean the session was bounced to a login wall.
    pub login_markers: Vec<String>,
    /// Prefix every member profile URL starts with.
    pub profile_prefix: String,
    /// Prefix every company page URL starts with.
    pub company_prefix: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::linkedin()
    }
}

impl SiteProfile {
    /// The production profile.
    #[must_use]
    pub fn linkedin() -> Self {
        Self::for_origin(LINKEDIN_ORIGIN)
    }

    /// The production profile rebased onto `origin` (e.g., `http://127.0.0.1:4321`).
    #[must_use]
    pub fn for_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            base_url: format!("{origin}/"),
            login_url: format!("{origin}/login"),
            authenticated_url: format!("{origin}/feed/"),
            jobs_search_url: format!("{origin}/jobs/search/"),
            identifier_selector: "#username".to_string(),
            secret_selector: "#password".to_string(),
            submit_selector: "button[type='submit']".to_string(),
            authenticated_marker: "/feed".to_string(),
            challenge_markers: vec!["/checkpoint/".to_string(), "/challenge".to_string()],
            login_markers: vec![
                "/login".to_string(),
                "/authwall".to_string(),
                "/uas/login".to_string(),
            ],
            profile_prefix: format!("{origin}/in/"),
            company_prefix: format!("{origin}/company/"),
        }
    }

    /// True when `location` shows a verification challenge.
    #[must_use]
    pub fn is_challenge(&self, location: &str) -> bool {
        self.challenge_markers
            .iter()
            .any(|marker| location.contains(marker.as_str()))
    }

    /// True only for the authenticated landing location, never a challenge.
    #[must_use]
    pub fn is_authenticated(&self, location: &str) -> bool {
        location.contains(self.authenticated_marker.as_str()) && !self.is_challenge(location)
    }

    /// True when `location` is a login wall.
    #[must_use]
    pub fn is_login_wall(&self, location: &str) -> bool {
        self.login_markers
            .iter()
            .any(|marker| location.contains(marker.as_str()))
    }

    /// True when `url` is a member profile URL on this site.
    #[must_use]
    pub fn is_profile_url(&self, url: &str) -> bool {
        url.starts_with(&self.profile_prefix) && url.len() > self.profile_prefix.len()
    }

    /// True when `url` is a company page URL on this site.
    #[must_use]
    pub fn is_company_url(&self, url: &str) -> bool {
        url.starts_with(&self.company_prefix) && url.len() > self.company_prefix.len()
    }

    /// Job search URL for `keywords` in `location`.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if the configured search URL is malformed.
    pub fn job_search_url(&self, keywords: &str, location: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.jobs_search_url)?;
        url.query_pairs_mut()
            .append_pair("keywords", keywords)
            .append_pair("location", location);
        Ok(url)
    }
}
