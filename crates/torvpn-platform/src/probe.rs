//! Connectivity check through the daemon's SOCKS listener
//!
//! One GET, no retries. The check page answers with a congratulation only
//! when the request arrives through the anonymizing network.

use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a connectivity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// The marker was found
    Success,
    /// Request failed or the marker was missing; never empty
    Failure(String),
}

impl ProbeResult {
    /// True for [`ProbeResult::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success)
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Success => f.write_str("traffic is routed through the daemon"),
            ProbeResult::Failure(reason) => write!(f, "check failed: {reason}"),
        }
    }
}

/// Fetches a page body through a proxy
pub trait BodyFetcher {
    /// GET `url` via `proxy` and return the body text
    fn fetch(&self, proxy: &str, url: &str) -> anyhow::Result<String>;
}

/// [`BodyFetcher`] backed by a blocking reqwest client
#[derive(Debug, Clone, Default)]
pub struct ProxiedHttpFetcher {
    timeout: Option<Duration>,
}

impl ProxiedHttpFetcher {
    /// Fetcher using the client's default timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl BodyFetcher for ProxiedHttpFetcher {
    fn fetch(&self, proxy: &str, url: &str) -> anyhow::Result<String> {
        let mut builder = reqwest::blocking::Client::builder().proxy(reqwest::Proxy::all(proxy)?);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let response = client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}

/// Checks whether requests leave through the daemon
pub struct ConnectivityProbe<F = ProxiedHttpFetcher> {
    fetcher: F,
    marker: String,
}

impl ConnectivityProbe<ProxiedHttpFetcher> {
    /// Probe over HTTP looking for `marker`
    pub fn http(marker: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self::new(ProxiedHttpFetcher::new().with_timeout(timeout), marker)
    }
}

impl<F: BodyFetcher> ConnectivityProbe<F> {
    /// Probe using a custom fetcher
    pub fn new(fetcher: F, marker: impl Into<String>) -> Self {
        Self {
            fetcher,
            marker: marker.into(),
        }
    }

    /// Fetch `url` through `proxy` and look for the marker
    pub fn check(&self, proxy: &str, url: &str) -> ProbeResult {
        debug!(proxy, url, "Running connectivity check");

        let body = match self.fetcher.fetch(proxy, url) {
            Ok(body) => body,
            Err(e) => {
                let mut reason = format!("{e:#}");
                if reason.is_empty() {
                    reason = "request failed".to_string();
                }
                warn!(proxy, url, error = %reason, "Connectivity check request failed");
                return ProbeResult::Failure(reason);
            }
        };

        if body.contains(&self.marker) {
            info!(url, "Connectivity check passed");
            ProbeResult::Success
        } else {
            warn!(url, bytes = body.len(), "Check page did not confirm routing");
            ProbeResult::Failure(format!("response from {url} does not contain '{}'", self.marker))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedFetcher(Result<&'static str, &'static str>);

    impl BodyFetcher for CannedFetcher {
        fn fetch(&self, _proxy: &str, _url: &str) -> anyhow::Result<String> {
            self.0.map(str::to_string).map_err(|e| anyhow::anyhow!(e))
        }
    }

    const PROXY: &str = "socks5h://127.0.0.1:10000";
    const URL: &str = "http://check.torproject.org";

    #[test]
    fn test_marker_present() {
        let probe = ConnectivityProbe::new(
            CannedFetcher(Ok("<h1>Congratulations. This browser is configured to use Tor.</h1>")),
            "Congratulations",
        );
        assert_eq!(probe.check(PROXY, URL), ProbeResult::Success);
    }

    #[test]
    fn test_marker_absent() {
        let probe = ConnectivityProbe::new(
            CannedFetcher(Ok("Sorry. You are not using Tor.")),
            "Congratulations",
        );
        match probe.check(PROXY, URL) {
            ProbeResult::Failure(reason) => assert!(reason.contains("Congratulations")),
            ProbeResult::Success => panic!("marker was not in the body"),
        }
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let probe = ConnectivityProbe::new(CannedFetcher(Ok("congratulations")), "Congratulations");
        assert!(!probe.check(PROXY, URL).is_success());
    }

    #[test]
    fn test_network_error_has_reason() {
        let probe = ConnectivityProbe::new(CannedFetcher(Err("connection refused")), "Congratulations");
        assert_eq!(
            probe.check(PROXY, URL),
            ProbeResult::Failure("connection refused".to_string())
        );
    }

    #[test]
    fn test_empty_error_gets_reason() {
        let probe = ConnectivityProbe::new(CannedFetcher(Err("")), "Congratulations");
        match probe.check(PROXY, URL) {
            ProbeResult::Failure(reason) => assert!(!reason.is_empty()),
            ProbeResult::Success => panic!("fetch failed"),
        }
    }

    #[test]
    fn test_closed_proxy_port() {
        let probe = ConnectivityProbe::http("Congratulations", Some(Duration::from_secs(5)));
        let result = probe.check("socks5h://127.0.0.1:1", URL);
        match result {
            ProbeResult::Failure(reason) => assert!(!reason.is_empty()),
            ProbeResult::Success => panic!("nothing listens on port 1"),
        }
    }

    #[test]
    fn test_invalid_proxy_url() {
        let probe = ConnectivityProbe::http("Congratulations", None);
        assert!(!probe.check("not a url", URL).is_success());
    }
}
