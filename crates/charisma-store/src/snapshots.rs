use tracing::instrument;

use charisma_core::ids::SessionId;
use charisma_core::transcript::ConversationSnapshot;

use crate::database::Database;
use crate::error::StoreError;

/// One document per session. `save` is an upsert, so a retried finalize
/// overwrites rather than duplicates.
#[derive(Clone)]
pub struct SnapshotRepo {
    db: Database,
}

impl SnapshotRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, snapshot), fields(session_id = %snapshot.session_id))]
    pub fn save(&self, snapshot: &ConversationSnapshot) -> Result<(), StoreError> {
        let transcript_json = serde_json::to_string(&snapshot.transcript)?;
        let character = serde_json::to_value(snapshot.character)?
            .as_str()
            .unwrap_or("neutral")
            .to_string();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO conversation_snapshots
                 (session_id, character, topic, transcript, bot_messages, user_messages,
                  speaker_rounds_completed, listener_rounds_completed, total_rounds, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    snapshot.session_id.as_str(),
                    character,
                    snapshot.topic,
                    transcript_json,
                    snapshot.bot_messages,
                    snapshot.user_messages,
                    snapshot.speaker_rounds_completed,
                    snapshot.listener_rounds_completed,
                    snapshot.total_rounds,
                    snapshot.finished_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn get(&self, session_id: &SessionId) -> Result<ConversationSnapshot, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, character, topic, transcript, bot_messages, user_messages,
                        speaker_rounds_completed, listener_rounds_completed, total_rounds, finished_at
                 FROM conversation_snapshots WHERE session_id = ?1",
            )?;
            let mut rows = stmt.query([session_id.as_str()])?;
            match rows.next()? {
                Some(row) => {
                    let id: String = row.get(0)?;
                    let character: String = row.get(1)?;
                    let transcript: String = row.get(3)?;
                    let finished_at: String = row.get(9)?;
                    Ok(ConversationSnapshot {
                        session_id: SessionId::from_raw(id),
                        character: serde_json::from_value(serde_json::Value::String(character))?,
                        topic: row.get(2)?,
                        transcript: serde_json::from_str(&transcript)?,
                        bot_messages: row.get(4)?,
                        user_messages: row.get(5)?,
                        speaker_rounds_completed: row.get(6)?,
                        listener_rounds_completed: row.get(7)?,
                        total_rounds: row.get(8)?,
                        finished_at: finished_at
                            .parse()
                            .map_err(|e| StoreError::Serialization(format!("finished_at: {e}")))?,
                    })
                }
                None => Err(StoreError::NotFound(format!("snapshot {session_id}"))),
            }
        })
    }

    pub fn count(&self) -> Result<u32, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM conversation_snapshots", [], |row| row.get(0))
                .map_err(StoreError::from)
        })
    }
}
