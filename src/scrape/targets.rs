//! Profile URL lists for batch runs.

use tracing::debug;

use crate::auth::SiteProfile;

/// Largest number of profiles a single batch run accepts.
pub const MAX_PROFILE_COUNT: usize = 100;

const SAMPLE_PROFILE_PATHS: &[&str] = &[
    "williamhgates/",
    "satyanadella/",
    "jeffweiner08/",
    "andrewyng/",
    "sundar-pichai-762a3b5b/",
    "timcook/",
];

/// Profile URLs found in `content`, at most `count` (itself capped at
/// [`MAX_PROFILE_COUNT`]).
///
/// Plain text is read one URL per line. With `csv` set, only the first
/// column of each row is read, with surrounding quotes removed. Anything
/// that is not a profile URL on `site` is ignored.
#[must_use]
pub fn profile_urls_from_text(
    content: &str,
    csv: bool,
    site: &SiteProfile,
    count: usize,
) -> Vec<String> {
    let count = count.min(MAX_PROFILE_COUNT);
    let mut urls = Vec::new();

    for line in content.lines() {
        let candidate = if csv {
            line.split(',').next().unwrap_or_default().trim().trim_matches('"')
        } else {
            line.trim()
        };
        if candidate.is_empty() {
            continue;
        }
        if !site.is_profile_url(candidate) {
            debug!(%candidate, "ignoring non-profile entry");
            continue;
        }
        urls.push(candidate.to_string());
        if urls.len() >= count {
            break;
        }
    }
    urls
}

/// A fixed list of well-known public profiles, at most `count`.
#[must_use]
pub fn sample_profile_urls(site: &SiteProfile, count: usize) -> Vec<String> {
    SAMPLE_PROFILE_PATHS
        .iter()
        .take(count.min(MAX_PROFILE_COUNT))
        .map(|path| format!("{}{path}", site.profile_prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lines_filtered_to_profiles() {
        let content = "https://www.linkedin.com/in/ada/\n\n  https://www.linkedin.com/in/grace/  \nhttps://example.com/x\n";
        let urls = profile_urls_from_text(content, false, &SiteProfile::linkedin(), 10);
        assert_eq!(
            urls,
            vec![
                "https://www.linkedin.com/in/ada/",
                "https://www.linkedin.com/in/grace/"
            ]
        );
    }

    #[test]
    fn test_csv_reads_first_column() {
        let content = "url,name\n\"https://www.linkedin.com/in/ada/\",Ada\nhttps://www.linkedin.com/in/grace/,Grace\n";
        let urls = profile_urls_from_text(content, true, &SiteProfile::linkedin(), 10);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://www.linkedin.com/in/ada/");
    }

    #[test]
    fn test_count_limits_results() {
        let content = "https://www.linkedin.com/in/a/\nhttps://www.linkedin.com/in/b/\n";
        let urls = profile_urls_from_text(content, false, &SiteProfile::linkedin(), 1);
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_sample_urls_rebased_on_site() {
        let site = SiteProfile::for_origin("http://127.0.0.1:9");
        let urls = sample_profile_urls(&site, 2);
        assert_eq!(urls, vec!["http://127.0.0.1:9/in/williamhgates/", "http://127.0.0.1:9/in/satyanadella/"]);
        assert_eq!(sample_profile_urls(&site, 500).len(), SAMPLE_PROFILE_PATHS.len());
    }
}
