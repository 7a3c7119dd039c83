//! Single owner of the live client set.
//!
//! Every register, unregister and broadcast is funnelled through one ordered
//! command channel into [`Hub::run`], which applies them one at a time. Only
//! the hub ever writes to or closes a client sink.

use std::collections::HashMap;
use std::pin::Pin;

use futures_util::{Sink, SinkExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::HubError;
use crate::models::OutboundMessage;
use crate::services::status_file::StatusFile;

/// Commands queued before the hub loop applies backpressure
const COMMAND_CAPACITY: usize = 64;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound half of a client connection, one text frame per item
pub type ClientSink = Pin<Box<dyn Sink<String, Error = SinkError> + Send>>;

enum HubCommand {
    Register { id: Uuid, sink: ClientSink },
    Unregister { id: Uuid },
    Broadcast { payload: String },
    Members { reply: oneshot::Sender<Vec<Uuid>> },
}

/// Cloneable submission side of the hub
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Add a connection to the live set. It is sent the current status right away.
    pub async fn register(&self, id: Uuid, sink: ClientSink) -> Result<(), HubError> {
        self.submit(HubCommand::Register { id, sink }).await
    }

    /// Remove and close a connection. Unknown ids are ignored.
    pub async fn unregister(&self, id: Uuid) -> Result<(), HubError> {
        self.submit(HubCommand::Unregister { id }).await
    }

    /// Deliver a message to every live connection
    pub async fn broadcast(&self, message: &OutboundMessage) -> Result<(), HubError> {
        let payload = message.to_json()?;
        self.submit(HubCommand::Broadcast { payload }).await
    }

    /// Ids of the live set once every previously submitted command has been applied
    pub async fn members(&self) -> Result<Vec<Uuid>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::Members { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn connection_count(&self) -> Result<usize, HubError> {
        Ok(self.members().await?.len())
    }

    async fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.tx.send(command).await.map_err(|_| HubError::Closed)
    }
}

/// The control loop state. Construct with [`Hub::new`] and spawn [`Hub::run`].
pub struct Hub {
    clients: HashMap<Uuid, ClientSink>,
    status_file: StatusFile,
    rx: mpsc::Receiver<HubCommand>,
}

impl Hub {
    pub fn new(status_file: StatusFile) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let hub = Self {
            clients: HashMap::new(),
            status_file,
            rx,
        };
        (hub, HubHandle { tx })
    }

    /// Apply commands in submission order until every handle is dropped
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                HubCommand::Register { id, sink } => self.register(id, sink).await,
                HubCommand::Unregister { id } => self.unregister(id).await,
                HubCommand::Broadcast { payload } => self.broadcast(payload).await,
                HubCommand::Members { reply } => {
                    let mut ids: Vec<Uuid> = self.clients.keys().copied().collect();
                    ids.sort();
                    let _ = reply.send(ids);
                }
            }
        }

        for (_, sink) in self.clients.drain() {
            close_sink(sink).await;
        }
        debug!("Connection hub stopped");
    }

    async fn register(&mut self, id: Uuid, sink: ClientSink) {
        if let Some(previous) = self.clients.insert(id, sink) {
            close_sink(previous).await;
        }
        info!(conn_id = %id, live = self.clients.len(), "client registered");

        // Best effort: an unreadable or empty file just means no initial frame
        let Ok(content) = self.status_file.read().await else {
            return;
        };
        let Some(message) = OutboundMessage::status(content) else {
            return;
        };
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(conn_id = %id, error = %e, "failed to encode initial status");
                return;
            }
        };

        let delivered = match self.clients.get_mut(&id) {
            Some(sink) => sink.send(payload).await.is_ok(),
            None => return,
        };
        if !delivered {
            self.evict(id).await;
        }
    }

    async fn unregister(&mut self, id: Uuid) {
        if let Some(sink) = self.clients.remove(&id) {
            close_sink(sink).await;
            info!(conn_id = %id, live = self.clients.len(), "client unregistered");
        }
    }

    async fn broadcast(&mut self, payload: String) {
        let mut dead = Vec::new();
        for (id, sink) in self.clients.iter_mut() {
            if let Err(e) = sink.send(payload.clone()).await {
                debug!(conn_id = %id, error = %e, "write failed");
                dead.push(*id);
            }
        }

        let recipients = self.clients.len() - dead.len();
        for id in dead {
            self.evict(id).await;
        }
        debug!(recipients, "broadcast delivered");
    }

    async fn evict(&mut self, id: Uuid) {
        if let Some(sink) = self.clients.remove(&id) {
            close_sink(sink).await;
            warn!(conn_id = %id, live = self.clients.len(), "evicted unwritable client");
        }
    }
}

async fn close_sink(mut sink: ClientSink) {
    if let Err(e) = sink.close().await {
        debug!(error = %e, "error while closing client sink");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_util::sink;
    use std::collections::BTreeSet;
    use std::path::Path;

    /// In-memory client: every frame the hub writes ends up in the receiver
    pub(crate) fn channel_sink() -> (ClientSink, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let sink = sink::unfold(tx, |tx, text: String| async move {
            match tx.send(text) {
                Ok(()) => Ok(tx),
                Err(e) => Err(Box::new(e) as SinkError),
            }
        });
        (Box::pin(sink), rx)
    }

    fn failing_sink() -> ClientSink {
        let sink = sink::unfold((), |(), _text: String| async move {
            Err::<(), SinkError>("transport severed".into())
        });
        Box::pin(sink)
    }

    fn spawn_hub(status_path: &Path) -> HubHandle {
        let (hub, handle) = Hub::new(StatusFile::new(status_path));
        tokio::spawn(hub.run());
        handle
    }

    fn status_json(content: &str) -> String {
        OutboundMessage::status(content).unwrap().to_json().unwrap()
    }

    #[tokio::test]
    async fn register_sends_current_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");
        std::fs::write(&path, "starting").unwrap();
        let hub = spawn_hub(&path);

        let (sink, mut rx) = channel_sink();
        let id = Uuid::new_v4();
        hub.register(id, sink).await.unwrap();

        assert_eq!(hub.members().await.unwrap(), vec![id]);
        assert_eq!(rx.recv().await.unwrap(), status_json("starting"));
    }

    #[tokio::test]
    async fn register_with_unreadable_status_keeps_client() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (sink, mut rx) = channel_sink();
        hub.register(Uuid::new_v4(), sink).await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn register_with_empty_status_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");
        std::fs::write(&path, "").unwrap();
        let hub = spawn_hub(&path);

        let (sink, mut rx) = channel_sink();
        hub.register(Uuid::new_v4(), sink).await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn register_write_failure_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");
        std::fs::write(&path, "starting").unwrap();
        let hub = spawn_hub(&path);

        hub.register(Uuid::new_v4(), failing_sink()).await.unwrap();

        assert_eq!(hub.connection_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unregister_closes_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (sink, mut rx) = channel_sink();
        let id = Uuid::new_v4();
        hub.register(id, sink).await.unwrap();

        hub.unregister(id).await.unwrap();
        hub.unregister(id).await.unwrap();

        assert!(hub.members().await.unwrap().is_empty());
        // The sink was dropped by the hub, so the channel is closed
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unregister_unknown_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (sink, _rx) = channel_sink();
        let id = Uuid::new_v4();
        hub.register(id, sink).await.unwrap();
        hub.unregister(Uuid::new_v4()).await.unwrap();

        assert_eq!(hub.members().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (sink1, mut rx1) = channel_sink();
        let (sink2, mut rx2) = channel_sink();
        hub.register(Uuid::new_v4(), sink1).await.unwrap();
        hub.register(Uuid::new_v4(), sink2).await.unwrap();

        hub.broadcast(&OutboundMessage::redirect("/")).await.unwrap();

        let expected = OutboundMessage::redirect("/").to_json().unwrap();
        assert_eq!(rx1.recv().await.unwrap(), expected);
        assert_eq!(rx2.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn broadcast_skips_later_registrations() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (early, mut early_rx) = channel_sink();
        hub.register(Uuid::new_v4(), early).await.unwrap();
        hub.broadcast(&OutboundMessage::status("first").unwrap())
            .await
            .unwrap();

        let (late, mut late_rx) = channel_sink();
        hub.register(Uuid::new_v4(), late).await.unwrap();
        hub.broadcast(&OutboundMessage::status("second").unwrap())
            .await
            .unwrap();
        hub.members().await.unwrap();

        assert_eq!(early_rx.recv().await.unwrap(), status_json("first"));
        assert_eq!(early_rx.recv().await.unwrap(), status_json("second"));
        assert_eq!(late_rx.recv().await.unwrap(), status_json("second"));
        assert!(late_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_write_evicts_only_that_client() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (healthy, mut healthy_rx) = channel_sink();
        let healthy_id = Uuid::new_v4();
        hub.register(healthy_id, healthy).await.unwrap();
        hub.register(Uuid::new_v4(), failing_sink()).await.unwrap();
        assert_eq!(hub.connection_count().await.unwrap(), 2);

        hub.broadcast(&OutboundMessage::status("50%").unwrap())
            .await
            .unwrap();

        assert_eq!(hub.members().await.unwrap(), vec![healthy_id]);
        assert_eq!(healthy_rx.recv().await.unwrap(), status_json("50%"));
    }

    #[tokio::test]
    async fn severed_transport_is_dropped_on_next_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        let (severed, severed_rx) = channel_sink();
        let (healthy, mut healthy_rx) = channel_sink();
        let healthy_id = Uuid::new_v4();
        hub.register(Uuid::new_v4(), severed).await.unwrap();
        hub.register(healthy_id, healthy).await.unwrap();

        // Peer disappears without unregistering
        drop(severed_rx);

        hub.broadcast(&OutboundMessage::status("a").unwrap())
            .await
            .unwrap();
        assert_eq!(hub.members().await.unwrap(), vec![healthy_id]);

        hub.broadcast(&OutboundMessage::status("b").unwrap())
            .await
            .unwrap();
        assert_eq!(hub.members().await.unwrap(), vec![healthy_id]);
        assert_eq!(healthy_rx.recv().await.unwrap(), status_json("a"));
        assert_eq!(healthy_rx.recv().await.unwrap(), status_json("b"));
    }

    #[tokio::test]
    async fn live_set_matches_replayed_model() {
        let dir = tempfile::tempdir().unwrap();
        let hub = spawn_hub(&dir.path().join("missing.txt"));

        // Connections 0..6; odd ones fail on first write
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let failing = |i: usize| i % 2 == 1;
        let mut receivers = Vec::new();
        let mut model: BTreeSet<Uuid> = BTreeSet::new();

        // Small deterministic generator so the op sequence is reproducible
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for _ in 0..200 {
            let i = next() % ids.len();
            match next() % 3 {
                0 => {
                    if model.contains(&ids[i]) {
                        continue;
                    }
                    let sink = if failing(i) {
                        failing_sink()
                    } else {
                        let (sink, rx) = channel_sink();
                        receivers.push(rx);
                        sink
                    };
                    hub.register(ids[i], sink).await.unwrap();
                    model.insert(ids[i]);
                }
                1 => {
                    hub.unregister(ids[i]).await.unwrap();
                    model.remove(&ids[i]);
                }
                _ => {
                    hub.broadcast(&OutboundMessage::redirect("/")).await.unwrap();
                    model.retain(|id| {
                        let idx = ids.iter().position(|x| x == id).unwrap();
                        !failing(idx)
                    });
                }
            }

            let live = hub.members().await.unwrap();
            assert_eq!(live, model.iter().copied().collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn run_returns_when_handles_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, handle) = Hub::new(StatusFile::new(dir.path().join("missing.txt")));
        let task = tokio::spawn(hub.run());

        let (sink, mut rx) = channel_sink();
        handle.register(Uuid::new_v4(), sink).await.unwrap();
        drop(handle);

        task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
