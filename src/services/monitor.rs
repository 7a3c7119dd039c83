use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::clients::readiness_client::ReadinessClient;
use crate::config::Config;
use crate::models::OutboundMessage;
use crate::services::status_file::StatusFile;
use crate::websocket::hub::HubHandle;

/// Polls the status file and the readiness probe, and feeds the hub
pub struct StatusMonitor {
    status_file: StatusFile,
    /// `None` when no probe client could be built; the target then never counts as ready
    readiness: Option<ReadinessClient>,
    hub: HubHandle,
    check_interval: Duration,
    probe_interval: Duration,
    redirect_target: String,
    /// Last content broadcast, for change detection only
    snapshot: Option<String>,
    last_probe: Option<Instant>,
    last_ready: bool,
}

impl StatusMonitor {
    pub fn new(
        status_file: StatusFile,
        readiness: Option<ReadinessClient>,
        hub: HubHandle,
        config: &Config,
    ) -> Self {
        Self {
            status_file,
            readiness,
            hub,
            check_interval: config.check_interval(),
            probe_interval: config.probe_interval(),
            redirect_target: config.redirect_target.clone(),
            snapshot: None,
            last_probe: None,
            last_ready: false,
        }
    }

    /// Take the current file content as the baseline without broadcasting it.
    /// Must run before clients can register, since they get the content on connect.
    pub async fn prime(&mut self) {
        self.snapshot = self.read_status().await;
    }

    /// Run forever
    pub async fn run(mut self) {
        info!(
            interval_ms = self.check_interval.as_millis() as u64,
            "Status monitor started"
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.check_interval).await;
        }
    }

    pub async fn tick(&mut self) {
        let current = self.read_status().await;

        if self.probe_due() {
            self.last_probe = Some(Instant::now());
            let ready = match &self.readiness {
                Some(readiness) => readiness.is_ready().await,
                None => false,
            };
            if ready && !self.last_ready {
                info!(
                    "Target application is ready, redirecting clients to {}",
                    self.redirect_target
                );
            }
            self.last_ready = ready;

            // Repeated on every probe so late clients are redirected too
            if ready {
                let message = OutboundMessage::redirect(self.redirect_target.clone());
                self.publish(&message).await;
            }
        }

        let Some(content) = current else {
            return;
        };
        if self.snapshot.as_deref() == Some(content.as_str()) {
            return;
        }
        if let Some(message) = OutboundMessage::status(content.clone()) {
            debug!("Status changed, broadcasting {} bytes", content.len());
            self.publish(&message).await;
        }
        self.snapshot = Some(content);
    }

    /// Current file content, or `None` when it cannot be used this tick
    async fn read_status(&self) -> Option<String> {
        match self.status_file.read().await {
            Ok(content) if !content.is_empty() => Some(content),
            Ok(_) => None,
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    fn probe_due(&self) -> bool {
        self.last_probe
            .map(|at| at.elapsed() >= self.probe_interval)
            .unwrap_or(true)
    }

    async fn publish(&self, message: &OutboundMessage) {
        if let Err(e) = self.hub.broadcast(message).await {
            warn!("Failed to hand message to hub: {}", e);
        }
    }
}
