//! LLM provider listing

use axum::Json;
use masforge_core::models::LlmProvider;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub default_model: String,
    pub supports_base_url: bool,
    pub env_var: String,
    /// API key present in the environment
    pub configured: bool,
}

impl From<LlmProvider> for ProviderInfo {
    fn from(provider: LlmProvider) -> Self {
        Self {
            id: provider.id().to_string(),
            name: provider.display_name().to_string(),
            default_model: provider.default_model().to_string(),
            supports_base_url: provider.supports_base_url(),
            env_var: provider.env_var().to_string(),
            configured: provider.has_api_key(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}

/// Get available LLM providers
#[utoipa::path(
    get,
    path = "/api/v1/providers",
    tag = "providers",
    responses(
        (status = 200, description = "List of supported LLM providers", body = ProvidersResponse)
    )
)]
pub async fn get_providers() -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: LlmProvider::all().into_iter().map(ProviderInfo::from).collect(),
    })
}
