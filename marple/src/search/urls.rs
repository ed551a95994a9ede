//! URL helpers shared by the sink, deduplicator, scorer and report.

use percent_encoding::percent_decode_str;
use url::Url;

/// Path suffixes of script endpoints whose identity lives in the query string.
const SCRIPT_SUFFIXES: &[&str] = &[".php", ".asp", ".aspx", ".jsp", ".cgi"];

/// Parses a hit URL, accepting only absolute http(s) URLs with a host.
#[must_use]
pub fn parse_hit_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Extracts the lowercased host from a URL, without a leading `www.`.
#[must_use]
pub fn extract_domain(raw: &str) -> Option<String> {
    let url = parse_hit_url(raw)?;
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map_or(host.clone(), String::from))
}

/// Checks if a domain equals or is a subdomain of `listed`.
#[must_use]
pub fn domain_matches(domain: &str, listed: &str) -> bool {
    let listed = listed.trim().trim_start_matches("www.").to_lowercase();
    if listed.is_empty() {
        return false;
    }
    domain == listed || domain.ends_with(&format!(".{listed}"))
}

/// Whether the path alone cannot identify the resource.
fn path_is_ambiguous(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    SCRIPT_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Builds the deduplication key for a URL.
///
/// The key ignores the scheme, a trailing slash, the fragment and host case.
/// The query string is kept only when the path alone is ambiguous, e.g.
/// `/profile.php?id=42`. Unparseable input falls back to a trimmed,
/// lowercased copy of the raw string.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let Some(url) = parse_hit_url(raw) else {
        return raw.trim().trim_end_matches('/').to_lowercase();
    };

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let mut key = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };

    let path = url.path();
    key.push_str(path.trim_end_matches('/'));

    if path_is_ambiguous(path) {
        if let Some(query) = url.query().filter(|q| !q.is_empty()) {
            key.push('?');
            key.push_str(query);
        }
    }

    key
}

/// Whether the URL path, query or a host label contains `token`,
/// case-insensitively.
///
/// The path and query are percent-decoded and punycode host labels are
/// converted back to Unicode, so non-ASCII usernames match the URL as it
/// was written.
#[must_use]
pub fn path_contains(raw: &str, token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    let token = token.to_lowercase();
    match parse_hit_url(raw) {
        Some(url) => {
            let mut haystack = decode_component(url.path());
            if let Some(query) = url.query() {
                haystack.push('?');
                haystack.push_str(&decode_component(query));
            }
            let (host, _) = idna::domain_to_unicode(url.host_str().unwrap_or_default());
            haystack.contains(&token) || host.to_lowercase().split('.').any(|label| label == token)
        }
        None => decode_component(raw).contains(&token),
    }
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().to_lowercase()
}

/// Number of non-empty path segments.
#[must_use]
pub fn path_depth(raw: &str) -> usize {
    parse_hit_url(raw).map_or(0, |url| {
        url.path_segments()
            .map_or(0, |segments| segments.filter(|s| !s.is_empty()).count())
    })
}

/// Naive PDF detection kept compatible with existing reports.
#[must_use]
pub fn is_pdf_url(url: &str) -> bool {
    url.ends_with("pdf") || url.contains("-pdf.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hit_url() {
        assert!(parse_hit_url("https://example.com/alice").is_some());
        assert!(parse_hit_url("").is_none());
        assert!(parse_hit_url("   ").is_none());
        assert!(parse_hit_url("/relative/path").is_none());
        assert!(parse_hit_url("mailto:alice@example.com").is_none());
        assert!(parse_hit_url("ftp://example.com/file").is_none());
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.Example.com/path"), Some("example.com".to_string()));
        assert_eq!(extract_domain("http://sub.example.com"), Some("sub.example.com".to_string()));
        assert_eq!(extract_domain("invalid"), None);
    }

    #[test]
    fn test_domain_matches() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(domain_matches("m.example.com", "www.example.com"));
        assert!(!domain_matches("notexample.com", "example.com"));
        assert!(!domain_matches("example.com", ""));
    }

    #[test]
    fn test_normalize_key_scheme_and_slash() {
        assert_eq!(
            normalize_key("https://example.com/alice/"),
            normalize_key("http://EXAMPLE.com/alice")
        );
        assert_eq!(normalize_key("https://example.com/alice#top"), "example.com/alice");
    }

    #[test]
    fn test_normalize_key_strips_query_for_specific_paths() {
        assert_eq!(
            normalize_key("https://example.com/alice?utm_source=x"),
            "example.com/alice"
        );
    }

    #[test]
    fn test_normalize_key_keeps_query_for_ambiguous_paths() {
        assert_eq!(
            normalize_key("https://example.com/profile.php?id=1"),
            "example.com/profile.php?id=1"
        );
        assert_ne!(
            normalize_key("https://example.com/?u=alice"),
            normalize_key("https://example.com/?u=bob")
        );
    }

    #[test]
    fn test_normalize_key_keeps_port() {
        assert_eq!(normalize_key("http://example.com:8080/a"), "example.com:8080/a");
    }

    #[test]
    fn test_path_contains() {
        assert!(path_contains("https://github.com/Alice", "alice"));
        assert!(path_contains("https://alice.example.com/", "alice"));
        assert!(path_contains("https://example.com/profile.php?user=alice", "alice"));
        assert!(!path_contains("https://example.com/bob", "alice"));
        assert!(path_contains("https://example.com/bob", ""));
    }

    #[test]
    fn test_path_contains_non_ascii() {
        assert!(path_contains("https://vk.com/алиса", "алиса"));
        assert!(path_contains("https://vk.com/%D0%90%D0%BB%D0%B8%D1%81%D0%B0", "алиса"));
        assert!(path_contains("https://example.com/search?q=%D0%B0%D0%BB%D0%B8%D1%81%D0%B0", "алиса"));
        assert!(path_contains("https://алиса.example.com/", "алиса"));
        assert!(path_contains("https://xn--80aaxl5a.example.com/", "алиса"));
        assert!(!path_contains("https://vk.com/борис", "алиса"));
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("https://example.com/"), 0);
        assert_eq!(path_depth("https://example.com/a/b/c/"), 3);
        assert_eq!(path_depth("not a url"), 0);
    }

    #[test]
    fn test_is_pdf_url() {
        assert!(is_pdf_url("https://example.com/cv.pdf"));
        assert!(is_pdf_url("https://example.com/download-pdf.html"));
        assert!(!is_pdf_url("https://example.com/pdf/index.html"));
    }
}
