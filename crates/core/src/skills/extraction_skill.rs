//! # Extraction Skill (LlmSpecOracle)
//!
//! Default oracle: asks the configured LLM provider for a typed structured
//! answer through radkit's `LlmFunction`, then hands it back as untrusted
//! JSON so it goes through the same validation as any other oracle.

use super::extraction::render_prompt;
use super::oracle::{OracleRequest, OracleResponse, SpecOracle};
use super::prompts;
use crate::error::ExtractionError;
use crate::models::ModelConfig;
use crate::run_llm_function;
use async_trait::async_trait;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An agent mentioned in the latest message
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ExtractedAgent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Tools this agent uses
    #[serde(default)]
    pub tools: Vec<String>,
    /// Names of agents this agent talks to
    #[serde(default)]
    pub communicates_with: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ExtractedConstraint {
    pub name: String,
    pub value: String,
}

/// Names the user explicitly asked to remove
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ExtractedRetraction {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Partial specification update; omitted fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ExtractedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<ExtractedAgent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ExtractedConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retract: Option<ExtractedRetraction>,
}

/// Structured output of the extractor prompt
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ExtractionOutput {
    #[serde(default)]
    pub updated_fields: ExtractedFields,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub follow_up_question: Option<String>,
}

impl ExtractionOutput {
    pub fn into_response(self) -> Result<OracleResponse, ExtractionError> {
        let updated_fields = serde_json::to_value(&self.updated_fields)
            .map_err(|e| ExtractionError::Unparsable(e.to_string()))?;
        Ok(OracleResponse {
            updated_fields,
            reply: self.reply,
            follow_up_question: self.follow_up_question,
        })
    }
}

/// LLM-backed oracle
#[derive(Debug, Clone, Default)]
pub struct LlmSpecOracle {
    config: ModelConfig,
}

impl LlmSpecOracle {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Direct call with an already rendered prompt
    pub async fn run(prompt: String, config: &ModelConfig) -> anyhow::Result<ExtractionOutput> {
        run_llm_function!(config, ExtractionOutput, prompts::EXTRACTOR, prompt)
    }
}

#[async_trait]
impl SpecOracle for LlmSpecOracle {
    fn name(&self) -> &str {
        "llm"
    }

    async fn respond(&self, request: &OracleRequest) -> Result<OracleResponse, ExtractionError> {
        let prompt = render_prompt(request);
        tracing::debug!(prompt_chars = prompt.len(), "Rendered extraction prompt");

        let output = Self::run(prompt, &self.config)
            .await
            .map_err(|e| ExtractionError::Backend(e.to_string()))?;
        output.into_response()
    }
}
