//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tourwatch_shared::time::{Clock, SystemClock};

use crate::{
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryPresenceRepository,
    },
    usecase::{
        ConnectSessionUseCase, DisconnectSessionUseCase, GetPresenceUseCase,
        RelayEmergencyUseCase, RelayLocationUseCase,
    },
};

use super::{
    config::ServerConfig,
    handler::{get_nearby_presence, get_presence, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Presence and SOS fan-out server
///
/// # Example
///
/// ```ignore
/// let server = Server::in_memory(ServerConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl Server {
    /// Create a new Server instance from already wired use cases
    pub fn new(
        connect_session_usecase: Arc<ConnectSessionUseCase>,
        disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
        relay_location_usecase: Arc<RelayLocationUseCase>,
        relay_emergency_usecase: Arc<RelayEmergencyUseCase>,
        get_presence_usecase: Arc<GetPresenceUseCase>,
        clock: Arc<dyn Clock>,
        config: ServerConfig,
    ) -> Self {
        let state = Arc::new(AppState {
            connect_session_usecase,
            disconnect_session_usecase,
            relay_location_usecase,
            relay_emergency_usecase,
            get_presence_usecase,
            clock,
            outbound_buffer: config.outbound_buffer.max(1),
        });
        Self { state, config }
    }

    /// Wire the in-memory registry and WebSocket pusher behind every use case
    ///
    /// Dependencies are created in order:
    /// 1. Repository
    /// 2. MessagePusher
    /// 3. UseCases
    pub fn in_memory(config: ServerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let message_pusher = Arc::new(WebSocketMessagePusher::new());

        Self::new(
            Arc::new(ConnectSessionUseCase::new(
                message_pusher.clone(),
                clock.clone(),
            )),
            Arc::new(DisconnectSessionUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            Arc::new(RelayLocationUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            Arc::new(RelayEmergencyUseCase::new(
                message_pusher.clone(),
                clock.clone(),
            )),
            Arc::new(GetPresenceUseCase::new(repository)),
            clock,
            config,
        )
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/presence", get(get_presence))
            .route("/api/presence/nearby", get(get_nearby_presence))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to the configured address and serve until a shutdown signal
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until a shutdown signal
    pub async fn serve(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let local_addr = listener.local_addr()?;
        tracing::info!("Tourwatch server listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws", local_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
