//! # HTTP API
//!
//! Shared application state and the `/api/v1` router.

pub mod providers;
pub mod sessions;
pub mod settings;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use masforge_core::session::{
    event_channel, EventSender, OrchestratorConfig, SessionContext, SessionOrchestrator, TurnEvent,
};
use masforge_core::skills::{LlmSpecOracle, SpecOracle};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ConfigDefaults, ConfigResponse, PersistedConfig};

/// One session: the context mutex serialises turns, the listing stays
/// readable while a turn is running
pub struct SessionHandle {
    context: Mutex<SessionContext>,
    listing: RwLock<sessions::SessionListItem>,
}

impl SessionHandle {
    fn new(ctx: SessionContext) -> Self {
        Self {
            listing: RwLock::new(sessions::SessionListItem::from(&ctx)),
            context: Mutex::new(ctx),
        }
    }
}

/// Application state
pub struct AppState {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    oracle: RwLock<Arc<dyn SpecOracle>>,
    turn_config: RwLock<OrchestratorConfig>,
    /// Rebuild the LLM oracle when provider settings change
    llm_backed: bool,
    config_path: PathBuf,
    event_tx: broadcast::Sender<TurnEvent>,
    turn_tx: EventSender,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Must be called inside a tokio runtime: spawns the event bridge
    pub fn new(
        oracle: Arc<dyn SpecOracle>,
        config: &PersistedConfig,
        config_path: PathBuf,
    ) -> Self {
        let (turn_tx, mut turn_rx) = event_channel();
        let (event_tx, _) = broadcast::channel(256);

        let forward = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = turn_rx.recv().await {
                // No subscribers is fine
                let _ = forward.send(event);
            }
        });

        Self {
            sessions: RwLock::new(HashMap::new()),
            oracle: RwLock::new(oracle),
            turn_config: RwLock::new(config.orchestrator_config()),
            llm_backed: false,
            config_path,
            event_tx,
            turn_tx,
        }
    }

    /// State backed by the LLM oracle described by `config` and the environment
    pub fn with_llm(config: &PersistedConfig, config_path: PathBuf) -> anyhow::Result<Self> {
        let oracle = Arc::new(LlmSpecOracle::new(config.model_config()?));
        let mut state = Self::new(oracle, config, config_path);
        state.llm_backed = true;
        Ok(state)
    }

    async fn orchestrator(&self) -> SessionOrchestrator {
        let oracle = self.oracle.read().await.clone();
        let config = self.turn_config.read().await.clone();
        SessionOrchestrator::new(oracle)
            .with_config(config)
            .with_event_channel(self.turn_tx.clone())
    }

    async fn session(&self, id: &str) -> Result<Arc<SessionHandle>, ApiError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Session not found: {}", id)))
    }

    /// Apply a saved configuration to future turns
    async fn reconfigure(&self, config: &PersistedConfig) -> anyhow::Result<()> {
        if self.llm_backed {
            let oracle: Arc<dyn SpecOracle> = Arc::new(LlmSpecOracle::new(config.model_config()?));
            *self.oracle.write().await = oracle;
        }
        *self.turn_config.write().await = config.orchestrator_config();
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

/// Error body with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            success: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MasForge API",
        version = "1.0.0",
        description = "Conversational specification of multi-agent systems"
    ),
    paths(
        sessions::create_session,
        sessions::list_sessions,
        sessions::get_session,
        sessions::delete_session,
        sessions::post_message,
        sessions::session_events,
        settings::get_config,
        settings::update_config,
        providers::get_providers,
    ),
    components(schemas(
        ApiResponse,
        sessions::MessageRequest,
        sessions::TurnResponse,
        sessions::SessionView,
        sessions::SessionListItem,
        sessions::SessionsResponse,
        ConfigResponse,
        ConfigDefaults,
        PersistedConfig,
        providers::ProviderInfo,
        providers::ProvidersResponse,
    )),
    tags(
        (name = "sessions", description = "Specification conversations"),
        (name = "config", description = "Persisted configuration"),
        (name = "providers", description = "LLM providers"),
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], Body::from(spec))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .nest("/api/v1/sessions", sessions::routes())
        .route(
            "/api/v1/config",
            get(settings::get_config).patch(settings::update_config),
        )
        .route("/api/v1/providers", get(providers::get_providers))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}
