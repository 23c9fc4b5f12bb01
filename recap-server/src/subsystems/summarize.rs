//! Summarization engine — prompt construction, model calls, and resilient
//! response parsing. No persistence happens here; both operations collapse
//! provider failures into "no result" so one room can never abort a batch.

use std::sync::Arc;

use recap_core::config::LlmConfig;
use recap_core::llm::{
    CallParams, CompletionBackend, CompletionConfig, CompletionError, OpenAiCompletionClient,
};

/// Build the completion backend from application config. The API key comes
/// from the environment, never the config file.
pub fn create_backend(config: &LlmConfig) -> Result<OpenAiCompletionClient, CompletionError> {
    let completion = CompletionConfig {
        api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        model: config.model.clone(),
        timeout_seconds: config.timeout_seconds,
        max_retries: config.max_retries,
        retry_delay_ms: config.retry_delay_ms,
    };
    OpenAiCompletionClient::new(completion, config.base_url.clone())
}

#[derive(Clone)]
pub struct Summarizer {
    backend: Arc<dyn CompletionBackend>,
    summary_params: CallParams,
    keyword_params: CallParams,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &LlmConfig) -> Self {
        Self {
            backend,
            summary_params: CallParams {
                max_tokens: config.summary_max_tokens,
                temperature: config.summary_temperature,
                top_p: config.top_p,
            },
            keyword_params: CallParams {
                max_tokens: config.keyword_max_tokens,
                temperature: config.keyword_temperature,
                top_p: config.top_p,
            },
        }
    }

    /// Free-text bullet summary for one room. Any provider failure is
    /// logged and returned as `None`.
    pub async fn summarize(&self, room_topic: &str, lines: &[String]) -> Option<String> {
        let prompt = build_summary_prompt(room_topic, lines);

        match self.backend.complete(&prompt, &self.summary_params).await {
            Ok(text) => {
                tracing::info!(
                    room_topic,
                    lines = lines.len(),
                    backend = self.backend.name(),
                    "Generated summary"
                );
                Some(text)
            }
            Err(e) => {
                tracing::warn!(room_topic, error = %e, "Summary generation failed");
                None
            }
        }
    }

    /// 5–10 keywords for one room; empty on any failure.
    pub async fn extract_keywords(&self, lines: &[String]) -> Vec<String> {
        let prompt = build_keyword_prompt(lines);

        match self.backend.complete(&prompt, &self.keyword_params).await {
            Ok(text) => parse_keyword_response(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Keyword extraction failed");
                Vec::new()
            }
        }
    }
}

/// Prompt for the free-text summary. Pure so the template is testable
/// without a live endpoint.
pub fn build_summary_prompt(room_topic: &str, lines: &[String]) -> String {
    format!(
        "The following is a conversation from a group chat named \"{}\".\n\n\
         {}\n\n\
         Please provide a concise summary of the key points and important \
         information shared in this conversation. Focus on:\n\
         1. Main topics discussed\n\
         2. Key questions and answers\n\
         3. Important information, links, or resources shared\n\
         4. Action items or decisions made (if any)\n\n\
         Format your summary in bullet points where appropriate.",
        room_topic,
        lines.join("\n")
    )
}

/// Prompt for keyword extraction.
pub fn build_keyword_prompt(lines: &[String]) -> String {
    format!(
        "Extract 5-10 key topics or keywords from this conversation:\n\n\
         {}\n\n\
         Return only the keywords as a JSON array of strings.",
        lines.join("\n")
    )
}

/// Two-tier keyword parse. Tier one decodes the first `[` .. last `]`
/// substring as a JSON array of strings; tier two splits the raw text on
/// newlines and commas. Never fails — garbage degrades to an empty list.
pub fn parse_keyword_response(raw: &str) -> Vec<String> {
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if start < end {
            if let Ok(keywords) = serde_json::from_str::<Vec<String>>(&raw[start..=end]) {
                return keywords;
            }
        }
    }

    raw.replace('\n', ",")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Scripted backend: returns a fixed response, or errors when scripted
    /// with `None`.
    struct ScriptedBackend {
        response: Option<String>,
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _prompt: &str,
            _params: &CallParams,
        ) -> Result<String, CompletionError> {
            match &self.response {
                Some(text) => Ok(text.clone()),
                None => Err(CompletionError::RetryExhausted { attempts: 3 }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn summarizer(response: Option<&str>) -> Summarizer {
        Summarizer::new(
            Arc::new(ScriptedBackend {
                response: response.map(str::to_string),
            }),
            &LlmConfig::default(),
        )
    }

    fn lines() -> Vec<String> {
        vec!["alice: hello".to_string(), "bob: hi there".to_string()]
    }

    // --- parsing ---

    #[test]
    fn test_parse_valid_json_array_passthrough() {
        let raw = r#"Here you go: ["rust", "async", "databases"] hope that helps"#;
        assert_eq!(
            parse_keyword_response(raw),
            vec!["rust", "async", "databases"]
        );
    }

    #[test]
    fn test_parse_bare_array() {
        assert_eq!(
            parse_keyword_response(r#"["one","two"]"#),
            vec!["one", "two"]
        );
    }

    #[test]
    fn test_parse_no_brackets_falls_back_to_splitting() {
        assert_eq!(
            parse_keyword_response("topic1, topic2\ntopic3"),
            vec!["topic1", "topic2", "topic3"]
        );
    }

    #[test]
    fn test_parse_invalid_bracketed_json_falls_back() {
        // Brackets present but not a valid string array.
        assert_eq!(
            parse_keyword_response("[topic1, topic2]"),
            vec!["[topic1", "topic2]"]
        );
    }

    #[test]
    fn test_parse_non_string_array_falls_back() {
        let parsed = parse_keyword_response("[1, 2, 3]");
        assert_eq!(parsed, vec!["[1", "2", "3]"]);
    }

    #[test]
    fn test_parse_empty_and_whitespace_returns_empty() {
        assert!(parse_keyword_response("").is_empty());
        assert!(parse_keyword_response("  \n  , ,\n").is_empty());
    }

    // --- prompts ---

    #[test]
    fn test_summary_prompt_embeds_topic_and_lines() {
        let prompt = build_summary_prompt("Team Sync", &lines());
        assert!(prompt.contains("\"Team Sync\""));
        assert!(prompt.contains("alice: hello\nbob: hi there"));
        assert!(prompt.contains("Action items or decisions made"));
    }

    #[test]
    fn test_keyword_prompt_requests_json_array() {
        let prompt = build_keyword_prompt(&lines());
        assert!(prompt.contains("5-10"));
        assert!(prompt.contains("JSON array of strings"));
    }

    // --- engine behavior ---

    #[tokio::test]
    async fn test_summarize_returns_text_on_success() {
        let s = summarizer(Some("- a bullet"));
        assert_eq!(
            s.summarize("Team Sync", &lines()).await,
            Some("- a bullet".to_string())
        );
    }

    #[tokio::test]
    async fn test_summarize_collapses_failure_to_none() {
        let s = summarizer(None);
        assert_eq!(s.summarize("Team Sync", &lines()).await, None);
    }

    #[tokio::test]
    async fn test_extract_keywords_parses_response() {
        let s = summarizer(Some(r#"["standup", "deploy"]"#));
        assert_eq!(s.extract_keywords(&lines()).await, vec!["standup", "deploy"]);
    }

    #[tokio::test]
    async fn test_extract_keywords_collapses_failure_to_empty() {
        let s = summarizer(None);
        assert!(s.extract_keywords(&lines()).await.is_empty());
    }
}
