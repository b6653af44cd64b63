//! WebSocket transport
//!
//! ```text
//!   client ──ws──▶ connection task ──SessionInput──▶ session loop (blocking)
//!   client ◀──ws── connection task ◀──outbox frame── session loop
//! ```
//!
//! Every connection runs in its own task and talks to the session loop only
//! through bounded channels. [`StateServer`] wires the router, the loop and
//! shutdown together.

mod client;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::Context;
use axum::Router;
use axum::extract::ws::Utf8Bytes;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::compose::Composer;
use crate::config::{ServerConfig, SessionConfig};
use crate::emulator::Emulator;
use crate::schema::{Registry, RegistryDocuments, SchemaError};
use crate::session::{SessionLoop, SessionStats};
use client::Transport;

/// Schema, emulator and listener, ready to serve.
pub struct StateServer<E: Emulator + 'static> {
    registry: Arc<Registry>,
    emulator: E,
    bind: SocketAddr,
    session: SessionConfig,
    outbound_queue: usize,
    input_queue: usize,
}

impl<E: Emulator + 'static> StateServer<E> {
    /// Load the schema against the emulator's address space.
    ///
    /// Fails if any field falls outside it.
    pub fn new(
        documents: &RegistryDocuments,
        emulator: E,
        bind: SocketAddr,
    ) -> Result<Self, SchemaError> {
        let registry = Registry::load(documents, emulator.memory_size())?;
        let defaults = ServerConfig::default();
        Ok(Self {
            registry: Arc::new(registry),
            emulator,
            bind,
            session: SessionConfig::default(),
            outbound_queue: defaults.outbound_queue,
            input_queue: defaults.input_queue,
        })
    }

    /// Use these loop timings instead of the defaults.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set the per-client and input queue capacities.
    pub fn with_queues(mut self, outbound: usize, input: usize) -> Self {
        self.outbound_queue = outbound.max(1);
        self.input_queue = input.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Serve until Ctrl-C or an emulator fault.
    pub async fn run(self) -> anyhow::Result<SessionStats> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` completes or the session loop stops.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> anyhow::Result<SessionStats> {
        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("failed to bind {}", self.bind))?;
        let local = listener.local_addr().context("listener has no address")?;
        tracing::info!(addr = %local, fields = self.registry.len(), "Listening for clients");

        let (inputs, session_inputs) = mpsc::channel(self.input_queue);
        let stop = Arc::new(AtomicBool::new(false));
        let composer = Composer::new(self.registry.clone(), self.session.priority());
        let session = SessionLoop::<E, Utf8Bytes>::new(
            self.emulator,
            composer,
            session_inputs,
            self.session,
            stop.clone(),
        );
        let mut session_task = tokio::task::spawn_blocking(move || session.run());

        let app = Router::new()
            .route("/", get(client::upgrade))
            .with_state(Transport {
                inputs,
                next_id: Arc::new(AtomicU64::new(1)),
                outbound_queue: self.outbound_queue,
            });
        let serve = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        );

        let finished = tokio::select! {
            joined = &mut session_task => Some(joined),
            result = async { serve.await } => {
                result.context("WebSocket server failed")?;
                None
            }
            () = shutdown => {
                tracing::info!("Shutdown requested");
                None
            }
        };

        // The listener is gone by now; stop the loop and wait for it
        stop.store(true, Ordering::Relaxed);
        let joined = match finished {
            Some(joined) => joined,
            None => session_task.await,
        };
        let stats = joined.context("session loop panicked")??;
        tracing::info!(
            ticks = stats.ticks,
            commands = stats.commands,
            "Server stopped"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::MemoryImage;

    fn documents() -> RegistryDocuments {
        RegistryDocuments::from_json_str(
            r#"{"player.x": {"address": "0x10", "kind": "scalar"}}"#,
            "{}",
        )
        .unwrap()
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[test]
    fn test_schema_checked_against_emulator() {
        let server = StateServer::new(&documents(), MemoryImage::new(0x20), loopback()).unwrap();
        assert_eq!(server.registry().memory_size(), 0x20);

        let result = StateServer::new(&documents(), MemoryImage::new(0x10), loopback());
        assert!(matches!(result, Err(SchemaError::OutOfRange { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let session = SessionConfig {
            warmup_frames: 3,
            ..SessionConfig::default()
        };
        let server = StateServer::new(&documents(), MemoryImage::new(0x20), loopback())
            .unwrap()
            .with_session(session);

        let stats = server.run_until(async {}).await.unwrap();
        assert!(stats.frames >= 3);
    }

    #[tokio::test]
    async fn test_bind_failure_reported() {
        let taken = TcpListener::bind(loopback()).await.unwrap();
        let addr = taken.local_addr().unwrap();
        let server = StateServer::new(&documents(), MemoryImage::new(0x20), addr).unwrap();

        let error = server.run_until(std::future::pending()).await.unwrap_err();
        assert!(error.to_string().contains("failed to bind"));
    }
}
