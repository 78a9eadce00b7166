//! Configuration endpoints

use axum::{extract::State, Json};
use masforge_core::models::LlmProvider;

use super::{ApiError, SharedState};
use crate::config::{ConfigDefaults, ConfigResponse, PersistedConfig};

/// Get current configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration and defaults", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let config = PersistedConfig::load(&state.config_path).await;
    Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    })
}

/// Update configuration (partial merge); applies to the next turn
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body = PersistedConfig,
    responses(
        (status = 200, description = "Updated configuration", body = ConfigResponse),
        (status = 400, description = "Invalid provider or timeout", body = super::ApiResponse)
    )
)]
pub async fn update_config(
    State(state): State<SharedState>,
    Json(updates): Json<PersistedConfig>,
) -> Result<Json<ConfigResponse>, ApiError> {
    if let Some(provider) = &updates.provider {
        provider
            .parse::<LlmProvider>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    if updates.extraction_timeout_secs == Some(0) {
        return Err(ApiError::bad_request(
            "extraction_timeout_secs must be at least 1",
        ));
    }

    let mut config = PersistedConfig::load(&state.config_path).await;
    config.merge(updates);

    if let Err(e) = config.save(&state.config_path).await {
        tracing::error!(path = %state.config_path.display(), error = %e, "Failed to save config");
        return Err(ApiError::internal(format!("Failed to save config: {}", e)));
    }
    state
        .reconfigure(&config)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    tracing::info!(?config, "Configuration updated");

    Ok(Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    }))
}
