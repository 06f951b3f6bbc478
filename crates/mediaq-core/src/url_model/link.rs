//! Validation of links sent by chat users.

use url::Url;

/// Why a message is not an acceptable download link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("not a URL: {0}")]
    Malformed(String),
    #[error("unsupported scheme: {0}")]
    Scheme(String),
    #[error("host not allowed: {0}")]
    HostNotAllowed(String),
}

/// True if `host` equals `allowed` or is a subdomain of it (case-insensitive).
fn host_matches(host: &str, allowed: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let allowed = allowed.trim().trim_start_matches('.').to_ascii_lowercase();
    if allowed.is_empty() {
        return false;
    }
    host == allowed || host.ends_with(&format!(".{allowed}"))
}

/// Parses `text` as an http(s) link whose host is in `allowed_hosts`.
///
/// Surrounding whitespace is ignored; a bare `host/path` without scheme is
/// accepted as https.
pub fn validate_link<S: AsRef<str>>(text: &str, allowed_hosts: &[S]) -> Result<Url, LinkError> {
    let text = text.trim();
    let parsed = match Url::parse(text) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{text}"))
            .map_err(|_| LinkError::Malformed(text.to_string()))?,
        Err(_) => return Err(LinkError::Malformed(text.to_string())),
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(LinkError::Scheme(parsed.scheme().to_string()));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| LinkError::Malformed(text.to_string()))?;
    if !allowed_hosts.iter().any(|a| host_matches(host, a.as_ref())) {
        return Err(LinkError::HostNotAllowed(host.to_string()));
    }
    Ok(parsed)
}
