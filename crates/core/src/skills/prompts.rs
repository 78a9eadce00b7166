//! Prompt templates bundled at compile time.

/// Extractor - turns one conversational turn into a specification patch
pub const EXTRACTOR: &str = include_str!("defaults/extractor.md");

/// All bundled prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![("extractor", EXTRACTOR)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_prompts_non_empty() {
        for (slug, content) in all_defaults() {
            assert!(content.len() > 50, "Prompt '{}' seems too short", slug);
        }
    }

    #[test]
    fn test_extractor_mentions_output_keys() {
        for key in ["updated_fields", "reply", "follow_up_question", "retract"] {
            assert!(EXTRACTOR.contains(key), "extractor prompt lacks `{}`", key);
        }
    }
}
