//! Server variables and SSL detection

use std::collections::BTreeMap;

use crate::config::SiteConfig;

/// Variable name prefixes that make up the request/server environment
const SERVER_PREFIXES: &[&str] = &[
    "SERVER_", "HTTP_", "REQUEST_", "REMOTE_", "SCRIPT_", "GATEWAY_", "PHP_", "HTTPS",
    "DOCUMENT_", "CONTENT_", "QUERY_", "PATH_INFO",
];

/// Substrings of variable names whose values are never displayed
const SECRET_MARKERS: &[&str] = &["AUTH", "COOKIE", "PASSWORD", "_PW", "TOKEN", "SECRET"];

pub const REDACTED: &str = "[redacted]";

/// Whether the site URL says it is served over https
pub fn site_claims_ssl(site: &SiteConfig) -> bool {
    site.url.to_ascii_lowercase().starts_with("https://")
}

/// Whether the site is really behind https: a proxy forwarding `https`, an
/// https admin URL, or an https site URL
pub fn detect_ssl(site: &SiteConfig, server: &BTreeMap<String, String>) -> bool {
    if server
        .get("HTTP_X_FORWARDED_PROTO")
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
    {
        return true;
    }

    if site.admin_url().to_ascii_lowercase().starts_with("https://") {
        return true;
    }

    site_claims_ssl(site)
}

/// Keep the server-related variables, sanitized and with secrets redacted
pub fn server_variables<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(name, _)| SERVER_PREFIXES.iter().any(|p| name.starts_with(p)))
        .map(|(name, value)| {
            let value = if SECRET_MARKERS.iter().any(|m| name.contains(m)) {
                REDACTED.to_string()
            } else {
                sanitize_text(&value)
            };
            (name, value)
        })
        .collect()
}

/// Strip tags and control characters, collapse whitespace
pub fn sanitize_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;

    for c in value.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_control() || c.is_whitespace() => out.push(' '),
            c => out.push(c),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
