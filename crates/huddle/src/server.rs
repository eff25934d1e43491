//! `HuddleServer` builder and server loop.
//!
//! This is the entry point for running a coordinator. It ties together all
//! the layers: transport → protocol → room actors, plus the telemetry
//! HTTP endpoints.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use huddle_protocol::JsonCodec;
use huddle_room::{Gatekeeper, Registry, RoomLimits};
use huddle_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::handler::handle_connection;
use crate::{ConnectionConfig, HuddleError, ServerConfig, telemetry};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) gatekeeper: Gatekeeper,
    pub(crate) codec: JsonCodec,
    pub(crate) connection: ConnectionConfig,
}

/// Builder for configuring and starting a Huddle server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), huddle::HuddleError> {
/// use huddle::prelude::*;
///
/// let server = HuddleServer::builder()
///     .bind("0.0.0.0:3000")
///     .telemetry("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HuddleServerBuilder {
    bind_addr: String,
    telemetry_addr: Option<String>,
    limits: RoomLimits,
    connection: ConnectionConfig,
    registry: Option<Registry>,
}

impl HuddleServerBuilder {
    /// Creates a builder with default limits and no telemetry endpoint.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_owned(),
            telemetry_addr: None,
            limits: RoomLimits::default(),
            connection: ConnectionConfig::default(),
            registry: None,
        }
    }

    /// Creates a builder from a loaded config file.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new()
            .bind(&config.listen.ws_addr)
            .telemetry(&config.listen.http_addr)
            .limits(config.limits)
            .connection(config.connection)
    }

    /// Sets the WebSocket listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_owned();
        self
    }

    /// Serves the telemetry endpoints on `addr`.
    pub fn telemetry(mut self, addr: &str) -> Self {
        self.telemetry_addr = Some(addr.to_owned());
        self
    }

    pub fn limits(mut self, limits: RoomLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Uses an existing registry instead of a fresh one.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validates the settings and binds the listeners.
    pub async fn build(self) -> Result<HuddleServer, HuddleError> {
        ServerConfig {
            limits: self.limits,
            connection: self.connection,
            ..ServerConfig::default()
        }
        .validate()?;

        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let telemetry = match &self.telemetry_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };

        let registry = self.registry.unwrap_or_default();
        let state = Arc::new(ServerState {
            gatekeeper: Gatekeeper::new(registry, self.limits),
            codec: JsonCodec,
            connection: self.connection,
        });

        Ok(HuddleServer {
            transport,
            telemetry,
            state,
        })
    }
}

impl Default for HuddleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Huddle server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HuddleServer {
    transport: WebSocketTransport,
    telemetry: Option<TcpListener>,
    state: Arc<ServerState>,
}

impl HuddleServer {
    /// Creates a new builder.
    pub fn builder() -> HuddleServerBuilder {
        HuddleServerBuilder::new()
    }

    /// Returns the WebSocket listen address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the telemetry listen address, if telemetry is enabled.
    pub fn telemetry_addr(&self) -> Option<SocketAddr> {
        self.telemetry.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// The registry holding this server's rooms.
    pub fn registry(&self) -> &Registry {
        self.state.gatekeeper.registry()
    }

    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), HuddleError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then evicts every
    /// participant and stops the telemetry endpoints.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), HuddleError>
    where
        F: Future<Output = ()> + Send,
    {
        let limits = *self.state.gatekeeper.limits();
        tracing::info!(
            addr = ?self.local_addr().ok(),
            telemetry = ?self.telemetry_addr(),
            max_rooms = limits.max_rooms,
            max_users_per_room = limits.max_users_per_room,
            seat_capacity = limits.seat_capacity,
            "Huddle server running"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let telemetry = self.telemetry.take().map(|listener| {
            let app = telemetry::router(self.registry().clone());
            let mut stop = stop_rx.clone();
            tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = stop.wait_for(|stopped| *stopped).await;
                    })
                    .await
            })
        });

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Huddle server shutting down");
        self.registry().shutdown().await;
        let _ = stop_tx.send(true);
        if let Some(task) = telemetry {
            match task.await {
                Ok(result) => result?,
                Err(e) => tracing::error!(error = %e, "telemetry task failed"),
            }
        }
        Ok(())
    }
}
