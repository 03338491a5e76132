//! Ordered battery of connectivity probes.
//!
//! Each probe runs to completion regardless of what the earlier ones found,
//! so the report always explains as much as it can about a broken setup.

use std::time::Duration;
use tracing::debug;

use crate::client::LmStudioClient;
use crate::endpoint;
use crate::error::ApiError;
use crate::prefs::KeyValueStore;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagStatus {
    Pending,
    Success,
    Warning,
    Error,
}

/// One probe's findings, in execution order within the report.
#[derive(Debug, Clone)]
pub struct DiagnosticResult {
    pub name: String,
    pub status: DiagStatus,
    pub message: String,
    pub details: Option<String>,
}

impl DiagnosticResult {
    fn new(name: &str, status: DiagStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// All probe results plus the URL they were run against.
#[derive(Debug)]
pub struct DiagnosticReport {
    pub api_url: String,
    pub results: Vec<DiagnosticResult>,
}

impl DiagnosticReport {
    pub fn passed(&self) -> usize {
        self.count(DiagStatus::Success)
    }

    pub fn warnings(&self) -> usize {
        self.count(DiagStatus::Warning)
    }

    pub fn failed(&self) -> usize {
        self.count(DiagStatus::Error)
    }

    fn count(&self, status: DiagStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Default endpoint for the general internet reachability probe.
pub const INTERNET_PROBE_URL: &str = "https://httpbin.org/get";

/// Deadline for the inference-server probe. Short, so a dead server reports
/// quickly instead of stalling the battery.
pub const SERVER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DiagnosticsRunner {
    http: reqwest::Client,
    internet_probe_url: String,
    server_timeout: Duration,
    loopback_reaches_server: bool,
}

impl Default for DiagnosticsRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsRunner {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            internet_probe_url: INTERNET_PROBE_URL.to_string(),
            server_timeout: SERVER_PROBE_TIMEOUT,
            loopback_reaches_server: true,
        }
    }

    /// Override the external endpoint used for the internet probe.
    pub fn with_internet_probe_url(mut self, url: impl Into<String>) -> Self {
        self.internet_probe_url = url.into();
        self
    }

    pub fn with_server_timeout(mut self, timeout: Duration) -> Self {
        self.server_timeout = timeout;
        self
    }

    /// Declare whether a loopback URL can reach the inference server from
    /// this device. False when the server runs on a different host, which is
    /// the classic mobile-device-plus-desktop-server split.
    pub fn with_loopback_reaches_server(mut self, reaches: bool) -> Self {
        self.loopback_reaches_server = reaches;
        self
    }

    /// Run all five probes in order. No probe failure aborts the run; the
    /// report always contains one settled result per probe.
    pub async fn run(&self, store: &dyn KeyValueStore) -> DiagnosticReport {
        let mut results = Vec::with_capacity(5);

        let api_url = self.check_preferences(store, &mut results);
        self.check_loopback(&api_url, &mut results);
        self.check_internet(&mut results).await;
        self.check_server(&api_url, &mut results).await;
        self.check_platform(&mut results);

        DiagnosticReport { api_url, results }
    }

    /// Probe 1: can the preference store be read, and what URL did it give us.
    /// A failed read still leaves the battery running against the default URL.
    fn check_preferences(
        &self,
        store: &dyn KeyValueStore,
        results: &mut Vec<DiagnosticResult>,
    ) -> String {
        const NAME: &str = "API URL Configuration";
        match store.get(crate::prefs::API_URL_KEY) {
            Ok(saved) => {
                let url = match saved {
                    Some(url) if !url.is_empty() => url,
                    _ => endpoint::DEFAULT_API_URL.to_string(),
                };
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Success, "API URL loaded successfully")
                        .with_details(url.clone()),
                );
                url
            }
            Err(err) => {
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Error, "Could not read preferences")
                        .with_details(err.to_string()),
                );
                endpoint::DEFAULT_API_URL.to_string()
            }
        }
    }

    /// Probe 2: loopback URL on a device that cannot reach the server via
    /// loopback is a configuration error, not a network failure.
    fn check_loopback(&self, api_url: &str, results: &mut Vec<DiagnosticResult>) {
        const NAME: &str = "Loopback Address Check";
        if endpoint::is_loopback(api_url) && !self.loopback_reaches_server {
            results.push(
                DiagnosticResult::new(NAME, DiagStatus::Error, "API URL points at this device")
                    .with_details(
                        "localhost and 127.0.0.1 refer to the machine running this client, \
                         not the one running the inference server. Use the server machine's \
                         IP address instead (e.g., http://192.168.1.100:1234).",
                    ),
            );
        } else if endpoint::is_loopback(api_url) {
            results.push(DiagnosticResult::new(
                NAME,
                DiagStatus::Success,
                "Loopback URL is valid for a server on this machine",
            ));
        } else {
            results.push(DiagnosticResult::new(
                NAME,
                DiagStatus::Success,
                "Using a network address",
            ));
        }
    }

    /// Probe 3: general HTTP reachability, independent of the server URL.
    async fn check_internet(&self, results: &mut Vec<DiagnosticResult>) {
        const NAME: &str = "Internet Connectivity";
        debug!("Probing internet connectivity via {}", self.internet_probe_url);
        let outcome = self
            .http
            .get(&self.internet_probe_url)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        match outcome {
            Ok(response) if response.status().is_success() => {
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Success, "Device can make HTTP requests")
                        .with_details("Successfully connected to test server"),
                );
            }
            Ok(response) => {
                results.push(
                    DiagnosticResult::new(
                        NAME,
                        DiagStatus::Warning,
                        "HTTP request returned non-OK status",
                    )
                    .with_details(format!("Status: {}", response.status().as_u16())),
                );
            }
            Err(err) => {
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Error, "Cannot make HTTP requests")
                        .with_details(err.to_string()),
                );
            }
        }
    }

    /// Probe 4: the inference server itself, via the models endpoint.
    async fn check_server(&self, api_url: &str, results: &mut Vec<DiagnosticResult>) {
        const NAME: &str = "Inference Server Connection";
        let client = LmStudioClient::new(api_url);
        match client.list_models(Some(self.server_timeout)).await {
            Ok(models) => {
                results.push(
                    DiagnosticResult::new(
                        NAME,
                        DiagStatus::Success,
                        "Successfully connected to the inference server",
                    )
                    .with_details(format!("Found {} model(s)", models.len())),
                );
            }
            Err(ApiError::Timeout) => {
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Error, "Cannot connect to the server")
                        .with_details(format!(
                            "Request timed out after {} seconds. The server may not be running \
                             or is unreachable.",
                            self.server_timeout.as_secs()
                        )),
                );
            }
            Err(ApiError::Http { status, .. }) => {
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Error, "Server returned an error")
                        .with_details(format!("HTTP {status}")),
                );
            }
            Err(err) => {
                let mut details = format!("{err}. ");
                if endpoint::is_loopback(api_url) && !self.loopback_reaches_server {
                    details.push_str(
                        "Make sure you are using the server machine's IP address, not localhost. ",
                    );
                }
                details.push_str(
                    "Check that the server is running and both machines are on the same network.",
                );
                results.push(
                    DiagnosticResult::new(NAME, DiagStatus::Error, "Cannot connect to the server")
                        .with_details(details),
                );
            }
        }
    }

    /// Probe 5: purely descriptive environment report.
    fn check_platform(&self, results: &mut Vec<DiagnosticResult>) {
        results.push(
            DiagnosticResult::new(
                "Platform Information",
                DiagStatus::Success,
                format!("Running on {}", std::env::consts::OS),
            )
            .with_details(format!("Architecture: {}", std::env::consts::ARCH)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{FileStore, API_URL_KEY};
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    /// Ephemeral address with nothing listening on it.
    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    }

    fn failing_runner(dead: &str) -> DiagnosticsRunner {
        DiagnosticsRunner::new()
            .with_internet_probe_url(format!("{dead}/get"))
            .with_server_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn fully_failing_transport_still_yields_five_settled_results() {
        let (_dir, store) = temp_store();
        let dead = dead_url().await;
        store.set(API_URL_KEY, &dead).unwrap();

        let report = failing_runner(&dead).run(&store).await;

        assert_eq!(report.results.len(), 5);
        assert!(report.results.iter().all(|r| r.status != DiagStatus::Pending));
        // Internet and server probes both failed; preferences, loopback, and
        // platform info still reported.
        assert_eq!(report.failed(), 2);
        assert_eq!(report.passed(), 3);
        assert_eq!(report.warnings(), 0);
    }

    #[tokio::test]
    async fn probes_report_in_execution_order() {
        let (_dir, store) = temp_store();
        let dead = dead_url().await;

        let report = failing_runner(&dead).run(&store).await;
        let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "API URL Configuration",
                "Loopback Address Check",
                "Internet Connectivity",
                "Inference Server Connection",
                "Platform Information",
            ]
        );
    }

    #[tokio::test]
    async fn unset_preference_reports_default_url() {
        let (_dir, store) = temp_store();
        let dead = dead_url().await;

        let report = failing_runner(&dead).run(&store).await;
        assert_eq!(report.api_url, endpoint::DEFAULT_API_URL);
        assert_eq!(
            report.results[0].details.as_deref(),
            Some(endpoint::DEFAULT_API_URL)
        );
    }

    #[tokio::test]
    async fn loopback_url_fails_when_server_is_remote() {
        let (_dir, store) = temp_store();
        let dead = dead_url().await;
        store.set(API_URL_KEY, "http://localhost:1234").unwrap();

        let report = failing_runner(&dead)
            .with_loopback_reaches_server(false)
            .with_server_timeout(Duration::from_millis(200))
            .run(&store)
            .await;

        let loopback = &report.results[1];
        assert_eq!(loopback.status, DiagStatus::Error);
        assert!(loopback.details.as_deref().unwrap().contains("IP address"));
    }

    #[tokio::test]
    async fn loopback_url_passes_when_server_is_local() {
        let (_dir, store) = temp_store();
        let dead = dead_url().await;
        store.set(API_URL_KEY, &dead).unwrap();

        let report = failing_runner(&dead).run(&store).await;
        assert_eq!(report.results[1].status, DiagStatus::Success);
    }
}
