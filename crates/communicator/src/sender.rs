//! Message sender — serial outbound delivery to the peer process
//!
//! All sends funnel through one worker task fed by a FIFO queue. The
//! worker awaits each HTTP exchange to completion before pulling the next
//! message, so the peer's listener observes requests in submission order.
//! Throughput does not matter here; the harness sends a handful of
//! messages per second at most, and some of them (sequential touches) are
//! order-dependent.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action::Action;
use crate::codec;
use crate::config::Endpoint;
use crate::error::{Error, Result};

/// Serializes actions and posts them to the peer's listener, one at a time
pub struct MessageSender {
    queue: mpsc::UnboundedSender<Vec<u8>>,
    worker: JoinHandle<()>,
}

impl MessageSender {
    /// Spawn the send worker for the given destination
    pub fn new(destination: Endpoint) -> Self {
        let (queue, mut pending) = mpsc::unbounded_channel::<Vec<u8>>();
        let client = reqwest::Client::new();
        let url = destination.url();

        let worker = tokio::spawn(async move {
            while let Some(body) = pending.recv().await {
                // Transport failures are logged and dropped. There is no
                // retry and no timeout in the core: the awaiting caller's
                // completion simply never fires, and the caller's own
                // outer deadline is the backstop.
                match client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .body(body)
                    .send()
                    .await
                {
                    Ok(response) if response.status().is_success() => {
                        debug!("Delivered message to {url}");
                    }
                    Ok(response) => {
                        warn!("Peer at {url} answered {}", response.status());
                    }
                    Err(err) => {
                        warn!("Transport error sending to {url}: {err}");
                    }
                }
            }
        });

        Self { queue, worker }
    }

    /// Encode and queue an action for delivery
    pub fn enqueue(&self, action: &Action) -> Result<()> {
        let body = codec::encode(action)?;
        self.queue.send(body).map_err(|_| Error::ChannelClosed)
    }

    /// Stop the send worker
    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

impl Drop for MessageSender {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
