use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};
use url::Url;

use super::error::AnalysisError;
use super::types::{AnalysisRequest, FetchResult};

/// Trims the input and prepends `https://` when no http(s) scheme is present.
pub fn normalize_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if has_http_scheme(trimmed) {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

fn has_http_scheme(input: &str) -> bool {
    let lower = input
        .get(..8)
        .unwrap_or(input)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn domain_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^https?://(?:www\.)?(.*?)\.").ok())
        .as_ref()
}

/// First label after the scheme and an optional `www.`, up to the next dot.
///
/// `https://www.synology.com/path` gives `synology`. Multi-label public
/// suffixes are not understood (`https://bbc.co.uk` gives `bbc`, but
/// `https://news.bbc.co.uk` gives `news`). Hosts without a dot fall back to
/// the host name.
pub fn domain_name(url: &str) -> String {
    if let Some(captures) = domain_pattern().and_then(|re| re.captures(url)) {
        if let Some(label) = captures.get(1) {
            return label.as_str().to_string();
        }
    }

    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
        .unwrap_or_else(|| {
            url.split_once("://")
                .map(|(_, rest)| rest)
                .unwrap_or(url)
                .trim_end_matches('/')
                .to_string()
        })
}

pub fn build_client() -> Result<reqwest::Client, AnalysisError> {
    reqwest::Client::builder()
        .build()
        .map_err(|source| AnalysisError::Transport {
            url: String::new(),
            source,
        })
}

/// One GET, no retry. Transport failures are errors, HTTP failures are a
/// [`FetchResult::Failure`].
pub async fn fetch_page(
    client: &reqwest::Client,
    request: &AnalysisRequest,
) -> Result<FetchResult, AnalysisError> {
    let url = request.url();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| AnalysisError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status().as_u16();
    if status != 200 {
        warn!(url, status, "fetch returned non-200 status");
        return Ok(FetchResult::Failure {
            status_code: status,
        });
    }

    let raw_html = response
        .text()
        .await
        .map_err(|source| AnalysisError::Transport {
            url: url.to_string(),
            source,
        })?;
    info!(url, status, bytes = raw_html.len(), "fetched page");
    Ok(FetchResult::Success { raw_html })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_scheme_once() {
        assert_eq!(
            normalize_input("example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_input("https://example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_input("http://example.com/a").as_deref(),
            Some("http://example.com/a")
        );
        assert_eq!(
            normalize_input("HTTPS://Example.com").as_deref(),
            Some("HTTPS://Example.com")
        );
    }

    #[test]
    fn normalized_input_never_has_two_schemes() {
        for raw in ["synology.com", "  www.rust-lang.org ", "a", "ftp.example.org/x"] {
            let normalized = normalize_input(raw).unwrap();
            assert!(normalized.starts_with("https://"));
            assert_eq!(normalized.matches("://").count(), 1, "{normalized}");
        }
    }

    #[test]
    fn blank_input_yields_no_url() {
        assert_eq!(normalize_input(""), None);
        assert_eq!(normalize_input("   \t"), None);
        assert_eq!(AnalysisRequest::from_input(" "), None);
    }

    #[test]
    fn malformed_input_is_passed_through() {
        assert_eq!(
            normalize_input("not a domain").as_deref(),
            Some("https://not a domain")
        );
    }

    #[test]
    fn domain_name_takes_first_label() {
        assert_eq!(domain_name("https://www.synology.com/path"), "synology");
        assert_eq!(domain_name("https://example.com"), "example");
        assert_eq!(domain_name("http://blog.example.com"), "blog");
        assert_eq!(domain_name("https://bbc.co.uk"), "bbc");
    }

    #[test]
    fn domain_name_without_dot_uses_host() {
        assert_eq!(domain_name("http://localhost:8080/"), "localhost");
        assert_eq!(domain_name("https://intranet"), "intranet");
    }
}
