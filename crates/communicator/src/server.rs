//! Message server — the loopback HTTP listener for inbound actions
//!
//! Binds 127.0.0.1 only, forced IPv4: the simulator environment is
//! dual-stack and the peer always dials the IPv4 loopback. The HTTP
//! response is a delivery acknowledgment, never an application-level
//! result, so every decoded-or-not request gets 202.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::action::Action;
use crate::codec;
use crate::config::Endpoint;
use crate::error::{Error, Result};

/// Receives every well-formed inbound action from the listener
pub trait InboundDispatcher: Send + Sync + 'static {
    fn dispatch(&self, action: Action);
}

#[derive(Clone)]
struct ServerState {
    dispatcher: Arc<dyn InboundDispatcher>,
}

/// Handle to the running listener; aborts the accept loop on drop
pub struct MessageServer {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MessageServer {
    /// Bind the listener and start serving.
    ///
    /// A bind failure is fatal to the caller: the fixed, predictable port
    /// is part of the protocol contract, so an occupied port signals a
    /// deployment bug, not a condition to retry.
    pub async fn bind(
        endpoint: &Endpoint,
        dispatcher: Arc<dyn InboundDispatcher>,
    ) -> Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, endpoint.port));
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            port: endpoint.port,
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let app = Router::new()
            .route(endpoint.path, post(receive))
            .layer(TraceLayer::new_for_http())
            .with_state(ServerState { dispatcher });

        let path = endpoint.path;
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("Message server terminated: {err}");
            }
        });

        info!("Message server listening on {local_addr}{path}");

        Ok(Self { local_addr, task })
    }

    /// The bound loopback address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the accept loop
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for MessageServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn receive(State(state): State<ServerState>, body: Bytes) -> StatusCode {
    match codec::decode(&body) {
        Ok(action) => state.dispatcher.dispatch(action),
        // HTTP-level acceptance and application-level validity are
        // different concerns; the message is dropped, not retried.
        Err(err) => warn!("Dropping malformed inbound message: {err}"),
    }
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Invocation;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<Action>>,
    }

    impl InboundDispatcher for Recorder {
        fn dispatch(&self, action: Action) {
            self.seen.lock().unwrap().push(action);
        }
    }

    #[tokio::test]
    async fn accepts_and_dispatches_well_formed_actions() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        // Port 0 lets the OS pick a free port for the test.
        let endpoint = Endpoint {
            path: "/toRunner",
            port: 0,
        };
        let server = MessageServer::bind(&endpoint, recorder.clone()).await.unwrap();

        let action = Action::new(Invocation::RunTest { number: 3 });
        let url = format!("http://{}/toRunner", server.local_addr());
        let response = reqwest::Client::new()
            .post(&url)
            .header("Content-Type", "application/json")
            .body(codec::encode(&action).unwrap())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 202);

        // The dispatch happens before the response is written.
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], action);
    }

    #[tokio::test]
    async fn malformed_bodies_still_get_202() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let endpoint = Endpoint {
            path: "/toParent",
            port: 0,
        };
        let server = MessageServer::bind(&endpoint, recorder.clone()).await.unwrap();

        let url = format!("http://{}/toParent", server.local_addr());
        let response = reqwest::Client::new()
            .post(&url)
            .body("not json at all")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 202);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn binding_an_occupied_port_is_fatal() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let endpoint = Endpoint {
            path: "/toRunner",
            port: 0,
        };
        let server = MessageServer::bind(&endpoint, recorder.clone()).await.unwrap();

        let occupied = Endpoint {
            path: "/toRunner",
            port: server.local_addr().port(),
        };
        let result = MessageServer::bind(&occupied, recorder).await;
        assert!(matches!(result, Err(Error::Bind { .. })));
    }
}
