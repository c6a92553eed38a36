use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use charisma_core::collab::{GenerateContext, GenerateError, PromptKind, TextGenerator};
use charisma_core::config::Character;

use crate::hardship::{extract_themes, Theme};
use crate::paraphrase::{fallback_paraphrase, strip_fillers};

/// Invitations spoken when the user confirms but offers nothing new.
pub const FOLLOW_UP_INVITATIONS: &[&str] = &[
    "Please continue sharing your thoughts.",
    "I'd love to hear more about it.",
    "Feel free to elaborate on that.",
    "Please go on, I'm listening attentively.",
];

pub fn follow_up_invitation() -> &'static str {
    FOLLOW_UP_INVITATIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FOLLOW_UP_INVITATIONS[0])
}

/// Deterministic generator backing every prompt kind with fixed
/// templates. This is the floor the conversation never drops below; the
/// LLM backend is an upgrade, not a requirement.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    /// Render synchronously; the trait impl defers to this, and callers
    /// holding a `dyn TextGenerator` use it as the infallible fallback.
    pub fn render(kind: PromptKind, ctx: &GenerateContext) -> String {
        match kind {
            PromptKind::IStatement => {
                let topic = if ctx.topic.is_empty() { "how we spend our time" } else { &ctx.topic };
                match ctx.character.unwrap_or_default() {
                    Character::Optimistic => format!(
                        "I feel hopeful that talking about {topic} will bring us closer together."
                    ),
                    Character::Neutral => format!(
                        "I feel that {topic} deserves our attention, and I want us to talk it through."
                    ),
                    Character::Pessimistic => format!(
                        "I worry that {topic} keeps weighing on us, and I want us to face it honestly."
                    ),
                }
            }
            PromptKind::Paraphrase => fallback_paraphrase(&ctx.input),
            PromptKind::TopicSummary => {
                let cleaned = strip_fillers(&ctx.input);
                cleaned
                    .to_lowercase()
                    .split_whitespace()
                    .take(6)
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim_end_matches(['.', '!', '?'])
                    .to_string()
            }
            PromptKind::Validation => "Thank you for sharing that with me.".to_string(),
            PromptKind::Collaborative => {
                let themes = extract_themes(&ctx.input);
                if themes.contains(&Theme::Communication) {
                    "I hear you. Open communication is key, and we can keep practicing these \
                     listening skills together."
                        .to_string()
                } else if themes.contains(&Theme::Understanding) {
                    "Building understanding takes time and patience. I appreciate your willingness \
                     to share and listen."
                        .to_string()
                } else if themes.contains(&Theme::Improvement) {
                    "That's a thoughtful approach. Small steps like that can lead to big changes \
                     for us."
                        .to_string()
                } else {
                    "I appreciate your ideas. Working together like this helps us both grow."
                        .to_string()
                }
            }
            PromptKind::Empathetic => {
                let base = match ctx.emotion.as_str() {
                    "sad" => "I hear the sadness in what you're saying, and it's okay to feel this way.",
                    "angry" => "I can sense your frustration, and these feelings are valid.",
                    "anxious" => "It's natural to feel worried about this, and you're not alone.",
                    "happy" => "I'm glad you're feeling positive about this.",
                    _ => "Thank you for sharing that with me; I'm here to listen and support you.",
                };
                format!("{base} Let's work through this together.")
            }
        }
    }
}

#[async_trait]
impl TextGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate(
        &self,
        kind: PromptKind,
        ctx: &GenerateContext,
    ) -> Result<String, GenerateError> {
        Ok(Self::render(kind, ctx))
    }
}

/// Configuration for the chat-completions backend.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: SecretString,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            temperature: 0.7,
            max_tokens: 150,
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions generator. Output is advisory: callers re-validate
/// everything it returns and fall back to templates on violation.
pub struct LlmGenerator {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmGenerator {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn prompt_for(kind: PromptKind, ctx: &GenerateContext) -> String {
        let tone = ctx.character.unwrap_or_default().tone();
        match kind {
            PromptKind::IStatement => format!(
                "Generate a first-person statement under 20 words about '{}'. It must be \
                 declarative, start with 'I feel' or 'I think', avoid blame, use a {tone} tone, \
                 and contain no questions. Only the statement itself.",
                ctx.topic
            ),
            PromptKind::Paraphrase => format!(
                "Restate this as a listener's paraphrase: '{}'. Never repeat exact words \
                 verbatim, transform 'I' to 'you' and 'my' to 'your', begin with 'I hear you \
                 saying', 'It sounds like', or 'What I understand is', stay under 25 words. \
                 Only the paraphrase.",
                strip_fillers(&ctx.input)
            ),
            PromptKind::TopicSummary => format!(
                "Reduce this answer to a topic phrase of at most 6 words, no punctuation: '{}'. \
                 Only the phrase.",
                ctx.input
            ),
            PromptKind::Validation => format!(
                "Generate a brief empathetic acknowledgement under 15 words of: '{}'. Detected \
                 emotion: {}. No questions. Only the response.",
                ctx.input, ctx.emotion
            ),
            PromptKind::Collaborative => format!(
                "Generate a collaborative reply under 20 words to this suggestion about '{}': \
                 '{}'. Use 'we' statements, stay warm and {tone}, no questions. Only the reply.",
                ctx.topic, ctx.input
            ),
            PromptKind::Empathetic => format!(
                "Generate an empathetic reply under 20 words to: '{}'. Detected emotion: {}. \
                 Validate the feeling, no advice, no questions. Only the reply.",
                ctx.input, ctx.emotion
            ),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(
        &self,
        kind: PromptKind,
        ctx: &GenerateContext,
    ) -> Result<String, GenerateError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [{"role": "user", "content": Self::prompt_for(kind, ctx)}],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GenerateError::Unavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Malformed(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerateError::Malformed("empty completion".into()));
        }
        Ok(text)
    }
}

/// Scripted generator for tests: returns the configured results in
/// order, then errors. Counts calls so tests can assert usage.
pub struct MockGenerator {
    responses: Mutex<Vec<Result<String, GenerateError>>>,
    call_count: AtomicUsize,
}

impl MockGenerator {
    pub fn new(responses: Vec<Result<String, GenerateError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Every call succeeds with the same text.
    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Every call fails; exercises the template-fallback paths.
    pub fn failing() -> Self {
        Self::new(vec![])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _kind: PromptKind,
        _ctx: &GenerateContext,
    ) -> Result<String, GenerateError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        if responses.len() == 1 {
            return responses[0].clone();
        }
        if responses.is_empty() {
            return Err(GenerateError::Unavailable("mock exhausted".into()));
        }
        Ok(responses.remove(0)?)
    }
}
