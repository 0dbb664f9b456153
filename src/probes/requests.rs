//! Outbound request reachability checks

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::USER_AGENT;
use reqwest::{Client as HttpClient, Method, StatusCode, Url};

use crate::config::{RequestsConfig, SiteConfig};
use crate::error::ProbeError;
use crate::probe::ProbeResult;

/// Sent with every probe request
pub const PROBE_USER_AGENT: &str = concat!("sitediag/", env!("CARGO_PKG_VERSION"));

/// Rate limit for outbound probe requests
const RATE_LIMIT_PER_SECOND: NonZeroU32 = NonZeroU32::new(6).unwrap();

/// Performs a single HTTP request and reports the status code
#[async_trait]
pub trait HttpProber: Send + Sync {
    async fn request(&self, url: &str, method: &str) -> Result<u16, ProbeError>;
}

/// reqwest-backed prober with a shared rate limiter
pub struct ReqwestProber {
    http: HttpClient,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ReqwestProber {
    pub fn new(config: &RequestsConfig) -> Result<Self, ProbeError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        let quota = Quota::per_second(RATE_LIMIT_PER_SECOND);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self { http, rate_limiter })
    }
}

#[async_trait]
impl HttpProber for ReqwestProber {
    async fn request(&self, url: &str, method: &str) -> Result<u16, ProbeError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| ProbeError::Network(format!("invalid method '{}': {}", method, e)))?;

        self.rate_limiter.until_ready().await;

        log::debug!("Probe request: {} {}", method, url);
        let response = self
            .http
            .request(method, url)
            .header(USER_AGENT, PROBE_USER_AGENT)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

/// Whether the site's own outbound policy would refuse this URL.
///
/// With `block_external` on, only the site host, localhost and the
/// accessible hosts (`*.example.com` wildcards allowed) stay reachable.
pub fn is_blocked_internally(site: &SiteConfig, url: &Url) -> bool {
    if !site.block_external {
        return false;
    }

    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.to_ascii_lowercase();

    if host == "localhost" || host == "127.0.0.1" {
        return false;
    }

    let site_host = Url::parse(&site.url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));
    if site_host.as_deref() == Some(host.as_str()) {
        return false;
    }

    !site
        .accessible_hosts
        .iter()
        .any(|pattern| host_matches(pattern, &host))
}

fn host_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    match pattern.strip_prefix("*.") {
        Some(domain) => host.ends_with(&format!(".{}", domain)),
        None => pattern == host,
    }
}

fn is_service_host(url: &Url, service_domain: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let domain = service_domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn status_text(code: u16) -> String {
    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    format!("{} {}", code, reason)
}

/// Check whether requests to `url` get through.
///
/// Returns `Ok` when the request answers 200, otherwise a problem describing
/// every reason found. Transport failures are findings, not errors; only a
/// URL that cannot be parsed is a [`ProbeError`].
pub async fn check_reachability(
    prober: &dyn HttpProber,
    site: &SiteConfig,
    service_domain: &str,
    url: &str,
    method: &str,
) -> Result<ProbeResult, ProbeError> {
    let parsed = Url::parse(url).map_err(|e| ProbeError::InvalidUrl(format!("{}: {}", url, e)))?;
    let mut findings = Vec::new();

    if is_blocked_internally(site, &parsed) {
        findings.push("Blocked internally.".to_string());
        findings.push(
            "Request returned an error: outbound requests to this host are blocked.".to_string(),
        );
        return Ok(ProbeResult::from_findings(findings));
    }

    match prober.request(url, method).await {
        Ok(200) => {}
        Ok(code) if is_service_host(&parsed, service_domain) => findings.push(format!(
            "Blocked by .htaccess file, a firewall, the host, or it could be down (http code is {}).",
            status_text(code)
        )),
        Ok(code) => findings.push(format!(
            "Blocked by .htaccess file, a firewall, or the host (http code is {}).",
            status_text(code)
        )),
        Err(e) => findings.push(format!("Request returned an error: {}", e)),
    }

    Ok(ProbeResult::from_findings(findings))
}

/// Replace the URL scheme, leaving the rest untouched
pub fn with_scheme(url: &str, scheme: &str) -> String {
    match url.split_once("://") {
        Some((_, rest)) => format!("{}://{}", scheme, rest),
        None => url.to_string(),
    }
}
