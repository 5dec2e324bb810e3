//! Podcast Script Generation
//!
//! Turns a free-form topic into the script the turn engine works from:
//! summarize, compress the summary a few times, then outline it.

use crate::llm_client::{ChatMessage, LLMClient};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_DENSITY_ITERATIONS: usize = 3;

const SUMMARY_PROMPT: &str =
    "You are a skilled summarizer. Create a concise summary of the following text.";
const COMPRESSION_PROMPT: &str = "You are an expert in information compression. Your task is to make the given text \
     more concise while preserving all key information. Aim to reduce the word count by \
     25% without losing important content.";
const OUTLINE_PROMPT: &str = "Create a high-level outline for a podcast episode based on the following summary. \
     Include 3-5 main topics to discuss.";

pub struct PodcastGenerator {
    client: Arc<dyn LLMClient>,
}

impl PodcastGenerator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    pub async fn generate_summary(&self, text: &str, max_tokens: u32) -> Result<String> {
        debug!("Generating summary with provided text.");
        let summary = self
            .client
            .create_chat_completion(
                vec![ChatMessage::system(SUMMARY_PROMPT), ChatMessage::user(text)],
                Some(max_tokens),
            )
            .await?;
        info!("Summary generated successfully.");
        Ok(summary)
    }

    /// Repeatedly asks the model to tighten `summary`, feeding each result into the next pass.
    pub async fn chain_of_density(
        &self,
        summary: &str,
        iterations: usize,
        max_tokens: u32,
    ) -> Result<String> {
        let mut dense_summary = summary.to_string();
        for i in 1..=iterations {
            debug!(iteration = i, iterations, "Compression iteration");
            dense_summary = self
                .client
                .create_chat_completion(
                    vec![
                        ChatMessage::system(COMPRESSION_PROMPT),
                        ChatMessage::user(format!(
                            "Original text:\n{}\n\nCompress this text, maintaining all key points but reducing verbosity.",
                            dense_summary
                        )),
                    ],
                    Some(max_tokens),
                )
                .await?;
        }
        info!(iterations, "Chain of density compression completed.");
        Ok(dense_summary)
    }

    pub async fn create_podcast_outline(
        &self,
        compressed_summary: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let outline = self
            .client
            .create_chat_completion(
                vec![
                    ChatMessage::system(OUTLINE_PROMPT),
                    ChatMessage::user(compressed_summary),
                ],
                Some(max_tokens),
            )
            .await?;
        info!("Podcast outline created successfully.");
        Ok(outline)
    }

    /// Runs the full pipeline and returns the markdown script.
    pub async fn generate_full_podcast(&self, input_text: &str) -> Result<String> {
        info!("Starting podcast generation process.");
        let result: Result<String> = async {
            let summary = self.generate_summary(input_text, DEFAULT_MAX_TOKENS).await?;
            let compressed = self
                .chain_of_density(&summary, DEFAULT_DENSITY_ITERATIONS, DEFAULT_MAX_TOKENS)
                .await?;
            let outline = self
                .create_podcast_outline(&compressed, DEFAULT_MAX_TOKENS)
                .await?;
            Ok(format!(
                "## Talking Points:\n{}\n\n## Topic Summary:\n{}",
                outline, compressed
            ))
        }
        .await;

        match &result {
            Ok(_) => info!("Podcast generation completed successfully."),
            Err(e) => error!(error = %e, "Podcast generation failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{MockLLMClient, Role};
    use anyhow::anyhow;
    use mockall::{Sequence, predicate::eq};

    fn system_prompt(messages: &[ChatMessage]) -> &str {
        assert_eq!(messages[0].role, Role::System);
        &messages[0].content
    }

    #[tokio::test]
    async fn test_full_pipeline_order_and_format() {
        let mut mock = MockLLMClient::new();
        let mut seq = Sequence::new();

        mock.expect_create_chat_completion()
            .withf(|messages, max_tokens| {
                system_prompt(messages) == SUMMARY_PROMPT
                    && messages[1].content == "Rust in 2026"
                    && *max_tokens == Some(300)
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("summary-0".to_string()));

        for i in 1..=3 {
            let previous = format!("summary-{}", i - 1);
            mock.expect_create_chat_completion()
                .withf(move |messages, _| {
                    system_prompt(messages) == COMPRESSION_PROMPT
                        && messages[1].content.contains(&previous)
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(format!("summary-{}", i)));
        }

        mock.expect_create_chat_completion()
            .withf(|messages, _| {
                system_prompt(messages) == OUTLINE_PROMPT && messages[1].content == "summary-3"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("1. Ownership\n2. Async".to_string()));

        let generator = PodcastGenerator::new(Arc::new(mock));
        let script = generator.generate_full_podcast("Rust in 2026").await.unwrap();

        assert_eq!(
            script,
            "## Talking Points:\n1. Ownership\n2. Async\n\n## Topic Summary:\nsummary-3"
        );
    }

    #[tokio::test]
    async fn test_chain_of_density_zero_iterations_is_identity() {
        let mut mock = MockLLMClient::new();
        mock.expect_create_chat_completion().never();
        let generator = PodcastGenerator::new(Arc::new(mock));
        assert_eq!(generator.chain_of_density("same", 0, 300).await.unwrap(), "same");
    }

    #[tokio::test]
    async fn test_failure_stops_pipeline() {
        let mut mock = MockLLMClient::new();
        mock.expect_create_chat_completion()
            .with(mockall::predicate::always(), eq(Some(300)))
            .times(1)
            .returning(|_, _| Err(anyhow!("Chat completion failed: 500 - boom")));

        let generator = PodcastGenerator::new(Arc::new(mock));
        let err = generator.generate_full_podcast("topic").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
