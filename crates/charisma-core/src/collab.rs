//! Narrow interfaces to the external collaborators. The conversation core
//! only ever sees these traits; concrete backends (HTTP LLMs, HTTP TTS,
//! keyword heuristics, test mocks) live in their own crates.

use async_trait::async_trait;

use crate::config::Character;

/// What the generator is being asked to produce. Prompt wording is the
/// implementation's business; the core only names the intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// A short first-person statement for the bot's speaker turn.
    IStatement,
    /// A perspective-shifted restatement of the user's utterance.
    Paraphrase,
    /// Normalize a chosen issue to a short phrase.
    TopicSummary,
    /// Brief empathetic acknowledgement of confirmed input.
    Validation,
    /// "We"-framed reply to a problem-solving suggestion.
    Collaborative,
    /// Reply to a hardship-indicating suggestion.
    Empathetic,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IStatement => "i_statement",
            Self::Paraphrase => "paraphrase",
            Self::TopicSummary => "topic_summary",
            Self::Validation => "validation",
            Self::Collaborative => "collaborative",
            Self::Empathetic => "empathetic",
        }
    }
}

/// Inputs a generator may draw on. Not every kind uses every field.
#[derive(Clone, Debug, Default)]
pub struct GenerateContext {
    /// The user utterance being responded to or restated.
    pub input: String,
    /// The session's selected topic, once known.
    pub topic: String,
    /// Emotion tag for the input, when one was detected.
    pub emotion: String,
    /// Personality the output should lean toward.
    pub character: Option<Character>,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),
    #[error("generation backend returned unusable output: {0}")]
    Malformed(String),
}

/// Text generation collaborator. May fail or return garbage; callers
/// re-validate and fall back to templates.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        kind: PromptKind,
        ctx: &GenerateContext,
    ) -> Result<String, GenerateError>;
}

/// Emotion tagging collaborator. Infallible by contract: implementations
/// return "neutral" when unsure.
pub trait EmotionTagger: Send + Sync {
    fn tag(&self, text: &str) -> String;
}

/// Synthesized audio ready to ship to a client.
#[derive(Clone, Debug)]
pub struct Audio {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesis unavailable: {0}")]
    Unavailable(String),
    #[error("synthesis failed: {0}")]
    Failed(String),
}

/// Speech synthesis collaborator.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str) -> Result<Audio, SynthesisError>;
}
