//! End-to-end conversation: a scripted client drives a full session
//! through issue selection, a speaker round with a rejected repeat-back,
//! a listener round with a confirmed paraphrase, and problem solving.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use charisma_core::config::SessionConfig;
use charisma_core::events::{EventPayload, RoomEvent};
use charisma_core::ids::SessionId;
use charisma_core::roles::Sender;
use charisma_dialogue::emotion::KeywordEmotionTagger;
use charisma_dialogue::generate::TemplateGenerator;
use charisma_relay::RoomRegistry;
use charisma_session::{BridgeConfig, SessionSupervisor, SupervisorConfig};
use charisma_speech::MockSynthesizer;
use charisma_store::{Database, SnapshotRepo};

fn quick_supervisor(relay: Arc<RoomRegistry>, db: Database) -> Arc<SessionSupervisor> {
    let config = SupervisorConfig {
        shutdown_grace: Duration::from_millis(100),
        bridge: BridgeConfig {
            speak_timeout: Duration::from_millis(100),
            listen_attempt_timeout: Duration::from_millis(200),
            listen_attempts: 3,
            keepalive_interval: Duration::from_millis(20),
        },
        ..Default::default()
    };
    Arc::new(SessionSupervisor::new(
        relay,
        Some(SnapshotRepo::new(db)),
        Arc::new(TemplateGenerator),
        Arc::new(KeywordEmotionTagger),
        // No synthesis backend: every bot line takes the text-only path.
        Arc::new(MockSynthesizer::failing()),
        config,
    ))
}

/// Scripted browser peer: answers each listen window with the next
/// reply, collects everything it observes, stops at session end.
fn spawn_client(
    relay: Arc<RoomRegistry>,
    session_id: SessionId,
    mut replies: VecDeque<&'static str>,
) -> tokio::task::JoinHandle<Vec<RoomEvent>> {
    let mut subscription = relay.join(&session_id);
    tokio::spawn(async move {
        let mut observed = Vec::new();
        let mut armed = false;
        while let Some(event) = subscription.receiver.recv().await {
            observed.push(event.clone());
            match &event.payload {
                EventPayload::MicActivated { activated: true } if !armed => {
                    armed = true;
                    if let Some(reply) = replies.pop_front() {
                        relay.publish(RoomEvent::new(
                            session_id.clone(),
                            EventPayload::UserInput { text: reply.to_string() },
                        ));
                    }
                }
                EventPayload::MicActivated { activated: false } => {
                    armed = false;
                }
                EventPayload::SessionEnded {} => break,
                _ => {}
            }
        }
        observed
    })
}

fn bot_lines(observed: &[RoomEvent]) -> Vec<String> {
    observed
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::NewMessage { text, sender: Sender::Bot } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn full_conversation_over_the_relay() {
    let relay = Arc::new(RoomRegistry::new(256));
    let db = Database::in_memory().unwrap();
    let repo = SnapshotRepo::new(db.clone());
    let supervisor = quick_supervisor(Arc::clone(&relay), db);

    let replies = VecDeque::from(vec![
        // Issue selection
        "work stress at my job",
        // Speaker round: an unrelated nonsense repeat-back, twice
        "bananas bananas bananas",
        "bananas bananas bananas",
        // Listener round: the user's statement, then a confirmation
        "I feel worried about my deadlines at work",
        "yes that is correct",
        // Problem solving
        "maybe we could talk together and plan breaks",
    ]);

    // On a current-thread test runtime the worker task cannot run until
    // this task yields, and spawn_client joins the room synchronously,
    // so the client never misses the greeting.
    let session_id = supervisor.create_session(SessionConfig::default()).unwrap();
    let client = spawn_client(Arc::clone(&relay), session_id.clone(), replies);

    let observed = tokio::time::timeout(Duration::from_secs(600), client)
        .await
        .expect("conversation never finished")
        .expect("client task panicked");

    // The supervisor observed the worker's exit and cleaned up.
    tokio::time::timeout(Duration::from_secs(60), async {
        while supervisor.session_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("supervisor never drained");
    assert_eq!(relay.peer_count(&session_id), 0);

    // Snapshot: one round per role, the chosen topic, finalized once.
    let snapshot = repo.get(&session_id).expect("snapshot persisted");
    assert_eq!(snapshot.topic, "work stress at my job");
    assert_eq!(snapshot.speaker_rounds_completed, 1);
    assert_eq!(snapshot.listener_rounds_completed, 1);
    assert_eq!(snapshot.total_rounds, 2);

    let lines = bot_lines(&observed);

    // The I-statement carried topic vocabulary.
    assert!(
        lines.iter().any(|l| l.contains("work stress")),
        "no topic-bearing statement in {lines:?}"
    );

    // The nonsense repeat-back was rejected, the bot re-spoke, and the
    // round still advanced through a corrective restatement.
    assert!(lines.iter().any(|l| l.contains("You may have misheard me")));
    assert!(lines.iter().any(|l| l.starts_with("Not quite.")));
    assert!(lines.iter().any(|l| l.contains("switch roles")));

    // The paraphrase shifted perspective and never echoed the input.
    let paraphrase = lines
        .iter()
        .find(|l| l.starts_with("It sounds like"))
        .expect("no paraphrase spoken");
    assert!(!paraphrase
        .to_lowercase()
        .contains("i feel worried about my deadlines"));
    assert!(paraphrase.contains("your deadlines"));

    // Problem solving picked the collaborative reply for a neutral
    // suggestion, then the session closed itself.
    assert!(lines.iter().any(|l| l.contains("communication")));
    assert!(lines.iter().any(|l| l.contains("Goodbye")));

    // Text-only delivery: synthesis failed for every line, audio never
    // shipped, and each spoken line produced exactly one message event.
    assert!(observed
        .iter()
        .any(|e| matches!(e.payload, EventPayload::TtsFailed { .. })));
    assert!(!observed
        .iter()
        .any(|e| matches!(e.payload, EventPayload::PlayAudio { .. })));
    assert_eq!(lines.len() as u32, snapshot.bot_messages);

    // The user's lines were echoed into the room by the worker.
    let user_echoes = observed
        .iter()
        .filter(|e| matches!(&e.payload, EventPayload::NewMessage { sender: Sender::User, .. }))
        .count();
    assert_eq!(user_echoes as u32, snapshot.user_messages);
}

#[tokio::test(start_paused = true)]
async fn goodbye_terminates_from_issue_selection() {
    let relay = Arc::new(RoomRegistry::new(256));
    let db = Database::in_memory().unwrap();
    let repo = SnapshotRepo::new(db.clone());
    let supervisor = quick_supervisor(Arc::clone(&relay), db);

    let session_id = supervisor.create_session(SessionConfig::default()).unwrap();
    let client = spawn_client(
        Arc::clone(&relay),
        session_id.clone(),
        VecDeque::from(vec!["ok bye"]),
    );

    let observed = tokio::time::timeout(Duration::from_secs(600), client)
        .await
        .expect("session never ended")
        .expect("client task panicked");

    let lines = bot_lines(&observed);
    assert!(lines.iter().any(|l| l.contains("Goodbye")));

    tokio::time::timeout(Duration::from_secs(60), async {
        while supervisor.session_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("supervisor never drained");

    let snapshot = repo.get(&session_id).expect("snapshot persisted");
    assert_eq!(snapshot.total_rounds, 0);
}

#[tokio::test(start_paused = true)]
async fn silent_client_conversation_still_terminates() {
    let relay = Arc::new(RoomRegistry::new(256));
    let db = Database::in_memory().unwrap();
    let repo = SnapshotRepo::new(db.clone());
    let supervisor = quick_supervisor(Arc::clone(&relay), db);

    // Client listens but never answers: every listen exhausts its
    // attempts and the machine runs forward on filler input.
    let session_id = supervisor.create_session(SessionConfig::default()).unwrap();
    let client = spawn_client(Arc::clone(&relay), session_id.clone(), VecDeque::new());

    let observed = tokio::time::timeout(Duration::from_secs(600), client)
        .await
        .expect("session never ended")
        .expect("client task panicked");

    tokio::time::timeout(Duration::from_secs(60), async {
        while supervisor.session_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("supervisor never drained");

    let snapshot = repo.get(&session_id).expect("snapshot persisted");
    // Total silence falls through to the default topic.
    assert_eq!(snapshot.topic, "balancing work and personal time");

    // The keepalive kept re-arming the microphone throughout.
    let activations = observed
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::MicActivated { activated: true }))
        .count();
    assert!(activations > 3);
}
