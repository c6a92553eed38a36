use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use charisma_core::collab::{EmotionTagger, SpeechSynthesizer, TextGenerator};
use charisma_core::config::SessionConfig;
use charisma_core::events::{EventPayload, RoomEvent};
use charisma_core::ids::SessionId;
use charisma_relay::RoomRegistry;
use charisma_store::SnapshotRepo;

use crate::bridge::{BridgeConfig, SessionBridge};
use crate::error::SessionError;
use crate::machine::ConversationMachine;
use crate::state::ConversationState;

/// Supervisor tunables.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Hard ceiling on concurrent sessions; creation past it fails.
    pub max_sessions: usize,
    /// How long `end_session` waits for a graceful exit before aborting.
    pub shutdown_grace: Duration,
    /// Disconnected-client age at which the reaper ends a session.
    pub idle_timeout: Duration,
    /// Reaper cadence.
    pub reap_interval: Duration,
    pub bridge: BridgeConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            shutdown_grace: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(5 * 60),
            bridge: BridgeConfig::default(),
        }
    }
}

/// Client-connection view of a session as the supervisor tracks it.
/// Inactive never kills the worker by itself; only the reaper or an
/// explicit end does.
#[derive(Clone, Copy, Debug)]
enum Activity {
    Active,
    Inactive { since: Instant },
}

struct SessionEntry {
    activity: Activity,
    cancel: CancellationToken,
    abort: tokio::task::AbortHandle,
    done: watch::Receiver<bool>,
}

/// Owns one worker task per live session: spawns them, observes their
/// exits, ends them on request, and reaps the ones whose client never
/// came back.
pub struct SessionSupervisor {
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    relay: Arc<RoomRegistry>,
    snapshots: Option<SnapshotRepo>,
    generator: Arc<dyn TextGenerator>,
    emotions: Arc<dyn EmotionTagger>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: SupervisorConfig,
}

impl SessionSupervisor {
    pub fn new(
        relay: Arc<RoomRegistry>,
        snapshots: Option<SnapshotRepo>,
        generator: Arc<dyn TextGenerator>,
        emotions: Arc<dyn EmotionTagger>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            relay,
            snapshots,
            generator,
            emotions,
            synthesizer,
            config,
        }
    }

    /// Allocate a fresh session id and launch its worker. The returned
    /// id names the relay room both peers use.
    pub fn create_session(&self, session_config: SessionConfig) -> Result<SessionId, SessionError> {
        if self.sessions.len() >= self.config.max_sessions {
            return Err(SessionError::Spawn(format!(
                "session capacity {} reached",
                self.config.max_sessions
            )));
        }

        let session_id = SessionId::new();
        let bridge = SessionBridge::new(
            session_id.clone(),
            Arc::clone(&self.relay),
            Arc::clone(&self.synthesizer),
            self.config.bridge.clone(),
        );
        let state = ConversationState::new(session_id.clone(), session_config.character);
        let machine = ConversationMachine::new(
            bridge,
            state,
            Arc::clone(&self.generator),
            Arc::clone(&self.emotions),
            session_config.clone(),
        );

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);

        let worker_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                snapshot = machine.run() => Some(snapshot),
                // Hard cancel: the in-flight speak/listen is abandoned,
                // the bridge leaves the room on drop.
                _ = worker_cancel.cancelled() => None,
            }
        });
        let abort = handle.abort_handle();

        // Monitor: observes worker exit on every path — normal return,
        // cancellation, abort, panic — so bookkeeping never leaks even
        // when end_session was never called.
        let sessions = Arc::clone(&self.sessions);
        let relay = Arc::clone(&self.relay);
        let snapshots = self.snapshots.clone();
        let monitor_session_id = session_id.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(Some(snapshot)) => {
                    if let Some(repo) = &snapshots {
                        // Best-effort: a failed write never troubles the
                        // (already finished) session.
                        if let Err(e) = repo.save(&snapshot) {
                            tracing::warn!(
                                session_id = %monitor_session_id,
                                error = %e,
                                "failed to persist conversation snapshot"
                            );
                        }
                    }
                    tracing::info!(session_id = %monitor_session_id, "session worker finished");
                }
                Ok(None) => {
                    tracing::info!(session_id = %monitor_session_id, "session worker cancelled");
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %monitor_session_id,
                        error = %e,
                        "session worker aborted or panicked"
                    );
                }
            }

            sessions.remove(&monitor_session_id);
            relay.publish(RoomEvent::new(
                monitor_session_id.clone(),
                EventPayload::SessionEnded {},
            ));
            let _ = done_tx.send(true);
        });

        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                activity: Activity::Active,
                cancel,
                abort,
                done: done_rx,
            },
        );

        tracing::info!(
            session_id = %session_id,
            character = %session_config.character,
            "session created"
        );
        Ok(session_id)
    }

    /// End a session: signal the worker, wait out the grace period,
    /// force-terminate if it is still alive. Idempotent; unknown or
    /// already-ended ids are a no-op.
    pub async fn end_session(&self, session_id: &SessionId) {
        let Some(entry) = self.sessions.get(session_id) else {
            tracing::debug!(session_id = %session_id, "end_session on unknown session ignored");
            return;
        };
        let cancel = entry.cancel.clone();
        let abort = entry.abort.clone();
        let mut done = entry.done.clone();
        drop(entry);

        tracing::info!(session_id = %session_id, "ending session");
        cancel.cancel();

        let graceful = tokio::time::timeout(self.config.shutdown_grace, done.wait_for(|d| *d)).await;
        if graceful.is_err() {
            tracing::warn!(session_id = %session_id, "grace period expired, force-terminating worker");
            abort.abort();
        }

        // The monitor removes the entry; doing it here too covers the
        // force-termination path racing a slow monitor.
        self.sessions.remove(session_id);
    }

    /// Client (re)joined its room.
    pub fn mark_connected(&self, session_id: &SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.activity = Activity::Active;
            tracing::debug!(session_id = %session_id, "session active");
        }
    }

    /// Client disconnected. The worker keeps running; the reaper handles
    /// sessions whose clients never return.
    pub fn mark_disconnected(&self, session_id: &SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.activity = Activity::Inactive { since: Instant::now() };
            tracing::debug!(session_id = %session_id, "session inactive");
        }
    }

    /// End every session whose client has been gone past the threshold.
    /// Returns how many were reaped.
    pub async fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter_map(|entry| match entry.value().activity {
                Activity::Inactive { since }
                    if now.duration_since(since) > self.config.idle_timeout =>
                {
                    Some(entry.key().clone())
                }
                _ => None,
            })
            .collect();

        let count = expired.len();
        for session_id in expired {
            tracing::info!(session_id = %session_id, "reaping idle session");
            self.end_session(&session_id).await;
        }
        count
    }

    /// Run `reap_idle` on a fixed period until the supervisor is dropped.
    pub fn start_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let supervisor = Arc::clone(self);
        let interval = supervisor.config.reap_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                let reaped = supervisor.reap_idle().await;
                if reaped > 0 {
                    tracing::info!(reaped, "idle session reap");
                }
            }
        })
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }
}
