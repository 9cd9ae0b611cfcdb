use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::completion::{CompletionModel, Message};

/// Turns a prompt into a short natural-language answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, prompt: &str, max_output_length: u32) -> anyhow::Result<String>;
}

/// Answers through a chat completion model.
///
/// Prompts longer than `max_input_chars` characters are cut; the tail of the
/// context is lost.
pub struct CompletionSynthesizer {
    completion: Arc<dyn CompletionModel>,
    max_input_chars: usize,
}

impl CompletionSynthesizer {
    pub fn new(completion: Arc<dyn CompletionModel>, max_input_chars: usize) -> Self {
        Self {
            completion,
            max_input_chars,
        }
    }
}

/// The first `max_chars` characters of `prompt`.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> &str {
    match prompt.char_indices().nth(max_chars) {
        Some((idx, _)) => &prompt[..idx],
        None => prompt,
    }
}

#[async_trait]
impl AnswerSynthesizer for CompletionSynthesizer {
    async fn synthesize(&self, prompt: &str, max_output_length: u32) -> anyhow::Result<String> {
        let input = truncate_prompt(prompt, self.max_input_chars);
        if input.len() < prompt.len() {
            debug!(
                "Prompt truncated from {} to {} bytes",
                prompt.len(),
                input.len()
            );
        }

        let result = self
            .completion
            .complete(&[Message::user(input)], Some(max_output_length), None)
            .await?;

        Ok(result.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionResult;
    use std::sync::Mutex;

    /// Records what it was asked and answers with padding.
    #[derive(Default)]
    struct RecordingCompletion {
        calls: Mutex<Vec<(Vec<Message>, Option<u32>)>>,
    }

    #[async_trait]
    impl CompletionModel for RecordingCompletion {
        async fn complete(
            &self,
            messages: &[Message],
            max_tokens: Option<u32>,
            _temperature: Option<f64>,
        ) -> anyhow::Result<CompletionResult> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), max_tokens));
            Ok(CompletionResult {
                content: "  Paris.\n".to_string(),
                usage: None,
            })
        }
    }

    #[test]
    fn test_truncate_prompt() {
        assert_eq!(truncate_prompt("hello", 10), "hello");
        assert_eq!(truncate_prompt("hello", 5), "hello");
        assert_eq!(truncate_prompt("hello", 3), "hel");
        assert_eq!(truncate_prompt("héllo", 2), "hé");
        assert_eq!(truncate_prompt("abc", 0), "");
    }

    #[tokio::test]
    async fn test_synthesize_sends_single_user_message() {
        let completion = Arc::new(RecordingCompletion::default());
        let synth = CompletionSynthesizer::new(completion.clone(), 4096);

        let answer = synth
            .synthesize("Query: capital?; Context: France", 200)
            .await
            .unwrap();
        assert_eq!(answer, "Paris.");

        let calls = completion.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (messages, max_tokens) = &calls[0];
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "Query: capital?; Context: France");
        assert_eq!(*max_tokens, Some(200));
    }

    #[tokio::test]
    async fn test_synthesize_truncates_long_prompt() {
        let completion = Arc::new(RecordingCompletion::default());
        let synth = CompletionSynthesizer::new(completion.clone(), 10);

        synth.synthesize(&"x".repeat(50), 20).await.unwrap();

        let calls = completion.calls.lock().unwrap();
        assert_eq!(calls[0].0[0].content, "x".repeat(10));
    }
}
