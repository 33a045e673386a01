//! The communicator — correlated request/response over loopback HTTP
//!
//! One instance per process, constructed by the composition root and
//! started exactly once. `send` suspends the calling task until the peer
//! acknowledges the exchange with a `Completed` action wrapping the
//! original; non-completion inbound actions fan out to subscribers on a
//! broadcast channel.
//!
//! The core deliberately has no timeout and no retry. A lost message
//! anywhere in the chain leaves the exchange permanently pending; the
//! caller's own outer deadline is the only backstop, and the caller is the
//! one with the domain context to decide whether resending is safe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info};

use crate::action::{Action, Invocation};
use crate::config::{HttpConfiguration, Role};
use crate::error::{Error, Result};
use crate::sender::MessageSender;
use crate::server::{InboundDispatcher, MessageServer};

const NOTIFICATION_CAPACITY: usize = 64;

/// Cross-process communicator for one side of the harness
pub struct Communicator {
    inner: Arc<Inner>,
    server: Mutex<Option<MessageServer>>,
}

struct Inner {
    role: Role,
    config: HttpConfiguration,
    /// Pending-completion table: at most one entry per identifier, removed
    /// exactly once when the matching `Completed` arrives.
    pending: Mutex<HashMap<String, oneshot::Sender<Action>>>,
    notifications: broadcast::Sender<Action>,
    sender: OnceLock<MessageSender>,
    orphaned_completions: AtomicU64,
}

impl Communicator {
    /// Create a communicator for the given role; does not bind anything
    pub fn new(role: Role, config: HttpConfiguration) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                role,
                config,
                pending: Mutex::new(HashMap::new()),
                notifications,
                sender: OnceLock::new(),
                orphaned_completions: AtomicU64::new(0),
            }),
            server: Mutex::new(None),
        }
    }

    /// Bind this role's listener and spawn the send worker.
    ///
    /// Must be called exactly once per process, before any `send`.
    pub async fn start(&self) -> Result<()> {
        if self.inner.sender.get().is_some() {
            return Err(Error::AlreadyStarted);
        }

        let source = self.inner.config.source(self.inner.role);
        let destination = self.inner.config.destination(self.inner.role);

        let server = MessageServer::bind(&source, self.inner.clone() as Arc<dyn InboundDispatcher>).await?;
        self.inner
            .sender
            .set(MessageSender::new(destination.clone()))
            .map_err(|_| Error::AlreadyStarted)?;
        *self.server.lock().unwrap() = Some(server);

        info!(
            "Communicator started as {:?}: listening on {}, sending to {}",
            self.inner.role,
            source.url(),
            destination.url()
        );
        Ok(())
    }

    /// Send an invocation and suspend until the peer acknowledges it.
    ///
    /// Resumes with the wrapped action carried by the peer's `Completed`
    /// reply. Never times out on its own; the only error after a
    /// successful enqueue is communicator teardown.
    pub async fn send(&self, invocation: Invocation) -> Result<Action> {
        let sender = self.inner.sender.get().ok_or(Error::NotStarted)?;

        let action = Action::new(invocation);
        let (resume, resumed) = oneshot::channel();
        self.inner
            .pending
            .lock()
            .unwrap()
            .insert(action.identifier.clone(), resume);
        debug!("Registered pending completion for {}", action.identifier);

        if let Err(err) = sender.enqueue(&action) {
            self.inner.pending.lock().unwrap().remove(&action.identifier);
            return Err(err);
        }

        resumed.await.map_err(|_| Error::ChannelClosed)
    }

    /// Acknowledge an action this process received and finished processing.
    ///
    /// Fire-and-forget: the acknowledgment itself registers no pending
    /// entry, since acknowledging an acknowledgment would recurse forever.
    pub fn completed(&self, action: Action) -> Result<()> {
        let sender = self.inner.sender.get().ok_or(Error::NotStarted)?;
        sender.enqueue(&Action::new(Invocation::Completed {
            action: Box::new(action),
        }))
    }

    /// Subscribe to inbound non-completion actions.
    ///
    /// Fan-out is multi-subscriber and never blocks the listener; a
    /// subscriber that falls behind loses old messages, not the server.
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.inner.notifications.subscribe()
    }

    /// Which side of the exchange this instance is
    pub fn role(&self) -> Role {
        self.inner.role
    }

    /// How many `Completed` acknowledgments arrived with no pending entry
    pub fn orphaned_completions(&self) -> u64 {
        self.inner.orphaned_completions.load(Ordering::Relaxed)
    }

    /// How many exchanges are still waiting for an acknowledgment
    pub fn pending_exchanges(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }

    /// Tear down the listener and the send worker
    pub fn shutdown(&self) {
        if let Some(server) = self.server.lock().unwrap().take() {
            server.shutdown();
        }
        if let Some(sender) = self.inner.sender.get() {
            sender.shutdown();
        }
    }
}

impl Inner {
    fn resolve_completion(&self, completed: Action) {
        let resume = self.pending.lock().unwrap().remove(&completed.identifier);
        match resume {
            Some(resume) => {
                debug!("Resuming exchange {}", completed.identifier);
                // A dropped receiver means the caller already gave up
                // (outer deadline); nothing left to resume.
                let _ = resume.send(completed);
            }
            None => {
                // A late or duplicate acknowledgment. Unrelated pending
                // entries are untouched; count it and keep running.
                self.orphaned_completions.fetch_add(1, Ordering::Relaxed);
                error!(
                    "No pending completion for {} (late or duplicate acknowledgment)",
                    completed.identifier
                );
            }
        }
    }
}

impl InboundDispatcher for Inner {
    fn dispatch(&self, action: Action) {
        match action.invocation {
            Invocation::Completed { action: completed } => {
                self.resolve_completion(*completed);
            }
            _ => {
                debug!("Publishing inbound action {}", action.identifier);
                // Zero subscribers is fine; publication must not block.
                let _ = self.notifications.send(action);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::LaneIndex;

    #[tokio::test]
    async fn send_before_start_fails() {
        let config = HttpConfiguration::for_lane(LaneIndex::new(200)).unwrap();
        let communicator = Communicator::new(Role::Runner, config);
        let result = communicator.send(Invocation::SwipeDown).await;
        assert!(matches!(result, Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn start_is_once_only() {
        let config = HttpConfiguration::for_lane(LaneIndex::new(201)).unwrap();
        let communicator = Communicator::new(Role::Runner, config);
        communicator.start().await.unwrap();
        let second = communicator.start().await;
        assert!(matches!(second, Err(Error::AlreadyStarted)));
        communicator.shutdown();
    }
}
