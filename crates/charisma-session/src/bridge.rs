use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use tokio::time::Instant;

use charisma_core::collab::SpeechSynthesizer;
use charisma_core::events::{EventPayload, RoomEvent};
use charisma_core::ids::SessionId;
use charisma_core::roles::Sender;
use charisma_relay::{RoomRegistry, RoomSubscription};
use charisma_speech::spoken_duration;

/// Returned by `listen` when every attempt timed out. Non-empty by
/// contract so the state machine always has something to act on.
pub const SILENCE_FALLBACK_UTTERANCE: &str = "I'm not sure what to say right now.";

/// Notice published alongside a text-only message when synthesis fails.
const TTS_FAILED_NOTICE: &str = "Audio is unavailable right now; continuing in text.";

/// Deadlines and retry budgets for the blocking primitives.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// How long `speak` waits for the client's playback acknowledgement.
    pub speak_timeout: Duration,
    /// Per-attempt wait for a transcript event.
    pub listen_attempt_timeout: Duration,
    /// Listen attempts before the filler utterance is returned.
    pub listen_attempts: u32,
    /// Microphone keepalive cadence while a listen is outstanding.
    pub keepalive_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            speak_timeout: Duration::from_secs(20),
            listen_attempt_timeout: Duration::from_secs(45),
            listen_attempts: 3,
            keepalive_interval: Duration::from_secs(5),
        }
    }
}

/// What happened to a `speak` call. The text event went out either way.
#[derive(Clone, Copy, Debug)]
pub struct SpeakOutcome {
    pub audio_delivered: bool,
    pub playback_acknowledged: bool,
}

/// Blocking `speak`/`listen` primitives for one session, built on the
/// relay. The worker's control flow calls these sequentially; taking
/// `&mut self` makes a second outstanding wait unrepresentable, which is
/// the single-flight guarantee the protocol needs.
pub struct SessionBridge {
    session_id: SessionId,
    relay: Arc<RoomRegistry>,
    subscription: RoomSubscription,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: BridgeConfig,
}

impl SessionBridge {
    /// Join the session's room as the worker peer.
    pub fn new(
        session_id: SessionId,
        relay: Arc<RoomRegistry>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: BridgeConfig,
    ) -> Self {
        let subscription = relay.join(&session_id);
        Self {
            session_id,
            relay,
            subscription,
            synthesizer,
            config,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Publish a transcript line without speaking it. Used to echo the
    /// user's own words back into the room for display.
    pub fn post_message(&self, sender: Sender, text: &str) {
        self.publish(EventPayload::NewMessage {
            text: text.to_string(),
            sender,
        });
    }

    /// Speak `text` to the client. On successful synthesis, publishes
    /// the audio and the text event, then waits for the playback
    /// acknowledgement or the deadline. On synthesis failure, publishes
    /// a failure notice and the text event, then sleeps for the
    /// estimated spoken duration. The text event goes out exactly once
    /// on every path.
    pub async fn speak(&mut self, text: &str) -> SpeakOutcome {
        self.drain_stale();

        match self.synthesizer.synthesize(text).await {
            Ok(audio) => {
                let audio_b64 = base64::engine::general_purpose::STANDARD.encode(&audio.bytes);
                self.publish(EventPayload::PlayAudio {
                    audio_b64,
                    mime: audio.mime,
                });
                self.post_message(Sender::Bot, text);

                let acknowledged = self.await_playback_end().await;
                if !acknowledged {
                    tracing::debug!(
                        session_id = %self.session_id,
                        "no playback acknowledgement before deadline"
                    );
                }
                SpeakOutcome {
                    audio_delivered: true,
                    playback_acknowledged: acknowledged,
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "synthesis failed, delivering text only"
                );
                self.publish(EventPayload::TtsFailed {
                    message: TTS_FAILED_NOTICE.to_string(),
                });
                self.post_message(Sender::Bot, text);

                // Approximate the spoken pacing so the turn order still
                // reads naturally on the client.
                tokio::time::sleep(spoken_duration(text)).await;
                SpeakOutcome {
                    audio_delivered: false,
                    playback_acknowledged: false,
                }
            }
        }
    }

    /// Wait for the user's next transcript line. Runs up to the
    /// configured number of attempts, each with its own deadline and a
    /// microphone keepalive, and returns the fixed filler utterance if
    /// all of them pass in silence. Never returns an empty string.
    pub async fn listen(&mut self) -> String {
        self.drain_stale();

        for attempt in 1..=self.config.listen_attempts {
            self.publish(EventPayload::MicActivated { activated: true });

            if let Some(text) = self.await_user_input().await {
                self.publish(EventPayload::MicActivated { activated: false });
                return text;
            }
            tracing::debug!(
                session_id = %self.session_id,
                attempt,
                "listen attempt timed out"
            );
        }

        self.publish(EventPayload::MicActivated { activated: false });
        tracing::info!(
            session_id = %self.session_id,
            "listen attempts exhausted, returning filler utterance"
        );
        SILENCE_FALLBACK_UTTERANCE.to_string()
    }

    async fn await_playback_end(&mut self) -> bool {
        let deadline = Instant::now() + self.config.speak_timeout;
        loop {
            tokio::select! {
                event = self.subscription.receiver.recv() => match event {
                    Some(event) => {
                        if matches!(event.payload, EventPayload::BotAudioEnded {}) {
                            return true;
                        }
                        self.log_discard(&event);
                    }
                    None => return false,
                },
                _ = tokio::time::sleep_until(deadline) => return false,
            }
        }
    }

    async fn await_user_input(&mut self) -> Option<String> {
        let deadline = Instant::now() + self.config.listen_attempt_timeout;
        let mut keepalive = tokio::time::interval(self.config.keepalive_interval);
        keepalive.tick().await; // the first tick fires immediately

        loop {
            tokio::select! {
                event = self.subscription.receiver.recv() => match event {
                    Some(event) => {
                        if let EventPayload::UserInput { text } = &event.payload {
                            let trimmed = text.trim();
                            if !trimmed.is_empty() {
                                return Some(trimmed.to_string());
                            }
                        } else {
                            self.log_discard(&event);
                        }
                    }
                    None => return None,
                },
                _ = keepalive.tick() => {
                    // Counteract client-side idle cutoffs during long waits.
                    self.publish(EventPayload::MicActivated { activated: true });
                }
                _ = tokio::time::sleep_until(deadline) => return None,
            }
        }
    }

    /// Inbound events with no outstanding wait are discarded, never
    /// queued.
    fn drain_stale(&mut self) {
        while let Ok(event) = self.subscription.receiver.try_recv() {
            self.log_discard(&event);
        }
    }

    fn log_discard(&self, event: &RoomEvent) {
        tracing::debug!(
            session_id = %self.session_id,
            event_type = event.payload.event_type(),
            "discarding inbound event with no matching wait"
        );
    }

    fn publish(&self, payload: EventPayload) {
        self.relay
            .publish(RoomEvent::new(self.session_id.clone(), payload));
    }
}

impl Drop for SessionBridge {
    fn drop(&mut self) {
        self.relay.leave(&self.session_id, &self.subscription.peer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_speech::MockSynthesizer;

    fn quick_config() -> BridgeConfig {
        BridgeConfig {
            speak_timeout: Duration::from_millis(200),
            listen_attempt_timeout: Duration::from_millis(100),
            listen_attempts: 3,
            keepalive_interval: Duration::from_millis(20),
        }
    }

    fn setup(
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> (Arc<RoomRegistry>, SessionId, RoomSubscription, SessionBridge) {
        let relay = Arc::new(RoomRegistry::new(64));
        let session_id = SessionId::new();
        let client = relay.join(&session_id);
        let bridge = SessionBridge::new(session_id.clone(), Arc::clone(&relay), synthesizer, quick_config());
        (relay, session_id, client, bridge)
    }

    fn collect_types(client: &mut RoomSubscription) -> Vec<&'static str> {
        let mut types = Vec::new();
        while let Ok(event) = client.receiver.try_recv() {
            types.push(event.payload.event_type());
        }
        types
    }

    #[tokio::test(start_paused = true)]
    async fn speak_success_publishes_audio_then_text() {
        let (_relay, _session, mut client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        let outcome = bridge.speak("hello there").await;
        assert!(outcome.audio_delivered);
        assert!(!outcome.playback_acknowledged); // nobody acked

        let types = collect_types(&mut client);
        assert_eq!(types, vec!["play_audio", "new_message"]);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_failure_still_publishes_text_exactly_once() {
        let (_relay, _session, mut client, mut bridge) =
            setup(Arc::new(MockSynthesizer::failing()));

        let outcome = bridge.speak("hello there").await;
        assert!(!outcome.audio_delivered);

        let types = collect_types(&mut client);
        assert_eq!(types, vec!["tts_failed", "new_message"]);
        assert_eq!(types.iter().filter(|t| **t == "new_message").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_returns_when_playback_acknowledged() {
        let (relay, session_id, _client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        let relay2 = Arc::clone(&relay);
        let sid = session_id.clone();
        let acker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            relay2.publish(RoomEvent::new(sid, EventPayload::BotAudioEnded {}));
        });

        let outcome = bridge.speak("short line").await;
        assert!(outcome.playback_acknowledged);
        acker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn listen_returns_user_input() {
        let (relay, session_id, _client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        let relay2 = Arc::clone(&relay);
        let sid = session_id.clone();
        let speaker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            relay2.publish(RoomEvent::new(
                sid,
                EventPayload::UserInput {
                    text: "  my answer  ".into(),
                },
            ));
        });

        let heard = bridge.listen().await;
        assert_eq!(heard, "my answer");
        speaker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn listen_exhaustion_returns_filler() {
        let (_relay, _session, mut client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        let heard = bridge.listen().await;
        assert_eq!(heard, SILENCE_FALLBACK_UTTERANCE);
        assert!(!heard.is_empty());

        // Attempt starts and keepalives all arrived as mic_activated events,
        // and the final deactivation closed the window.
        let types = collect_types(&mut client);
        assert!(types.iter().all(|t| *t == "mic_activated"));
        assert!(types.len() > 3);
    }

    #[tokio::test(start_paused = true)]
    async fn listen_emits_keepalives_while_waiting() {
        let (relay, session_id, mut client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        let relay2 = Arc::clone(&relay);
        let sid = session_id.clone();
        let speaker = tokio::spawn(async move {
            // Reply after several keepalive periods.
            tokio::time::sleep(Duration::from_millis(70)).await;
            relay2.publish(RoomEvent::new(sid, EventPayload::UserInput { text: "hi".into() }));
        });

        let heard = bridge.listen().await;
        assert_eq!(heard, "hi");
        speaker.await.unwrap();

        let keepalives = collect_types(&mut client)
            .iter()
            .filter(|t| **t == "mic_activated")
            .count();
        assert!(keepalives >= 3, "expected repeated keepalives, got {keepalives}");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_events_are_discarded_not_queued() {
        let (relay, session_id, _client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        // Arrives while no listen is outstanding.
        relay.publish(RoomEvent::new(
            session_id.clone(),
            EventPayload::UserInput { text: "stale".into() },
        ));

        // The listen that follows must not see it.
        let heard = bridge.listen().await;
        assert_eq!(heard, SILENCE_FALLBACK_UTTERANCE);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_user_input_does_not_satisfy_listen() {
        let (relay, session_id, _client, mut bridge) =
            setup(Arc::new(MockSynthesizer::succeeding()));

        let relay2 = Arc::clone(&relay);
        let sid = session_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            relay2.publish(RoomEvent::new(sid, EventPayload::UserInput { text: "   ".into() }));
        });

        let heard = bridge.listen().await;
        assert_eq!(heard, SILENCE_FALLBACK_UTTERANCE);
    }

    #[tokio::test]
    async fn dropping_bridge_leaves_room() {
        let relay = Arc::new(RoomRegistry::new(8));
        let session_id = SessionId::new();
        let bridge = SessionBridge::new(
            session_id.clone(),
            Arc::clone(&relay),
            Arc::new(MockSynthesizer::succeeding()),
            quick_config(),
        );
        assert_eq!(relay.peer_count(&session_id), 1);
        drop(bridge);
        assert_eq!(relay.peer_count(&session_id), 0);
    }
}
