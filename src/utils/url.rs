//! URL helpers for joining the configured API origin with endpoint paths.

/// Strip trailing slashes so endpoint paths can be appended safely.
///
/// ```
/// use readmegen::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.readme.dev/"), "https://api.readme.dev");
/// assert_eq!(normalize_base_url("https://api.readme.dev///"), "https://api.readme.dev");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path without doubling slashes.
///
/// ```
/// use readmegen::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.readme.dev/", "/repos/octo/demo/sections"),
///     "https://api.readme.dev/repos/octo/demo/sections"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Scheme, host and port of `url`; used as the credential account name.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

/// Split an `owner/name` repository slug.
pub fn parse_repo_slug(slug: &str) -> Option<(String, String)> {
    let (owner, name) = slug.trim().trim_matches('/').split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slashes() {
        assert_eq!(
            normalize_base_url("http://localhost:8080/"),
            "http://localhost:8080"
        );
        assert_eq!(normalize_base_url("http://localhost:8080"), "http://localhost:8080");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn joins_paths_with_a_single_slash() {
        assert_eq!(
            construct_api_url("http://localhost:8080", "sse/subscribe"),
            "http://localhost:8080/sse/subscribe"
        );
        assert_eq!(
            construct_api_url("http://localhost:8080/api/", "///users/reissue"),
            "http://localhost:8080/api/users/reissue"
        );
    }

    #[test]
    fn origin_drops_path_and_keeps_port() {
        assert_eq!(
            origin_of("http://localhost:8080/api/v1").as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(
            origin_of("https://api.readme.dev/").as_deref(),
            Some("https://api.readme.dev")
        );
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn parses_repo_slugs() {
        assert_eq!(
            parse_repo_slug("octo/hello-world"),
            Some(("octo".to_string(), "hello-world".to_string()))
        );
        assert_eq!(parse_repo_slug("octo"), None);
        assert_eq!(parse_repo_slug("octo/a/b"), None);
        assert_eq!(parse_repo_slug("/name"), None);
    }
}
