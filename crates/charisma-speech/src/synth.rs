use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};

use charisma_core::collab::{Audio, SpeechSynthesizer, SynthesisError};

/// Configuration for an OpenAI-compatible `/audio/speech` endpoint.
#[derive(Clone, Debug)]
pub struct TtsConfig {
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub api_key: SecretString,
}

/// HTTP text-to-speech client. Returns MP3 bytes on success; any
/// transport or status failure surfaces as `SynthesisError` and the
/// bridge degrades to text-only delivery.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl HttpSynthesizer {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    fn name(&self) -> &str {
        "http"
    }

    async fn synthesize(&self, text: &str) -> Result<Audio, SynthesisError> {
        let url = format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "voice": self.config.voice,
            "input": text,
            "response_format": "mp3",
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SynthesisError::Failed(format!("status {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Failed(e.to_string()))?;

        if bytes.is_empty() {
            return Err(SynthesisError::Failed("empty audio body".into()));
        }

        Ok(Audio {
            bytes: bytes.to_vec(),
            mime: "audio/mpeg".to_string(),
        })
    }
}

/// Synthesizer for deployments with no TTS backend configured: every
/// request reports unavailability, which routes the bridge onto its
/// text-only path with paced delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextOnlySynthesizer;

#[async_trait]
impl SpeechSynthesizer for TextOnlySynthesizer {
    fn name(&self) -> &str {
        "text-only"
    }

    async fn synthesize(&self, _text: &str) -> Result<Audio, SynthesisError> {
        Err(SynthesisError::Unavailable("no synthesis backend configured".into()))
    }
}

/// Scripted synthesizer for tests: succeeds or fails per construction
/// and records what it was asked to say.
pub struct MockSynthesizer {
    fail: bool,
    requests: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str) -> Result<Audio, SynthesisError> {
        self.requests.lock().push(text.to_string());
        if self.fail {
            Err(SynthesisError::Failed("mock failure".into()))
        } else {
            Ok(Audio {
                bytes: vec![0u8; 16],
                mime: "audio/mpeg".to_string(),
            })
        }
    }
}
