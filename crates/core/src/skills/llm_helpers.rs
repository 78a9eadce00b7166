//! # LLM Helpers
//!
//! Provider dispatch for radkit's `LlmFunction`, kept in one place so oracles
//! only deal with `ModelConfig`.

/// Run an `LlmFunction` with a typed structured output against whichever
/// provider `$config` selects. Expands to an `anyhow::Result<$output_type>`
/// and must be used inside an async fn returning `anyhow::Result`.
#[macro_export]
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr) => {{
        use radkit::agent::LlmFunction;
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;

        let config = $config;
        tracing::debug!(
            provider = %config.provider,
            model = %config.model,
            "Calling structured LLM function"
        );
        let result: anyhow::Result<$output_type> = match config.provider {
            LlmProvider::OpenAI => {
                let llm = match &config.base_url {
                    Some(base_url) => OpenAILlm::from_env(&config.model)?.with_base_url(base_url),
                    None => OpenAILlm::from_env(&config.model)?,
                };
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model)?;
                LlmFunction::<$output_type>::new_with_system_instructions(llm, $system_prompt)
                    .run($input)
                    .await
                    .map_err(Into::into)
            }
        };
        result
    }};
}

pub use run_llm_function;
