use reqwest::{header, redirect, Client};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

/// Body markers used to tell the target application apart from our own loading page
#[derive(Debug, Clone)]
pub struct ReadinessHeuristic {
    pub app_markers: Vec<String>,
    pub loading_marker: String,
}

impl ReadinessHeuristic {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_markers: config.probe_app_markers.clone(),
            loading_marker: config.probe_loading_marker.clone(),
        }
    }
}

/// Best-effort guess at whether the target application has taken over its address.
///
/// Only HTML counts. The body must either name the application or at least not be
/// the loading page. A miss here just means the next probe will try again.
pub fn classify(content_type: Option<&str>, body: &str, heuristic: &ReadinessHeuristic) -> bool {
    let is_html = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false);
    if !is_html {
        return false;
    }

    let names_app = heuristic
        .app_markers
        .iter()
        .any(|marker| !marker.is_empty() && body.contains(marker.as_str()));
    names_app || !body.contains(heuristic.loading_marker.as_str())
}

#[derive(Debug, Clone)]
pub struct ReadinessClient {
    client: Client,
    url: String,
    heuristic: ReadinessHeuristic,
}

impl ReadinessClient {
    pub fn new(
        url: String,
        timeout: Duration,
        heuristic: ReadinessHeuristic,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            url,
            heuristic,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.probe_url.clone(),
            config.probe_timeout(),
            ReadinessHeuristic::from_config(config),
        )
    }

    /// Probe the target once. Any transport failure counts as not ready.
    pub async fn is_ready(&self) -> bool {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Readiness probe to {} failed: {}", self.url, e);
                return false;
            }
        };

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Failed to read readiness probe body from {}: {}", self.url, e);
                return false;
            }
        };

        let ready = classify(content_type.as_deref(), &body, &self.heuristic);
        debug!(url = %self.url, ready, "readiness probe finished");
        ready
    }
}
