use dashmap::DashMap;
use tokio::sync::mpsc;

use charisma_core::events::RoomEvent;
use charisma_core::ids::{PeerId, SessionId};

/// A peer's membership in one room: the id to leave with and the
/// receiving end of the room's fan-out.
pub struct RoomSubscription {
    pub peer_id: PeerId,
    pub receiver: mpsc::Receiver<RoomEvent>,
}

struct PeerHandle {
    id: PeerId,
    tx: mpsc::Sender<RoomEvent>,
}

/// Room membership table. Rooms exist exactly as long as they have
/// peers: created on first join, dropped on last leave. Membership
/// mutations for one room serialize on its map entry; a publish sees a
/// consistent member snapshot (a peer joining mid-publish may miss that
/// event, which the at-most-once contract allows).
pub struct RoomRegistry {
    rooms: DashMap<SessionId, Vec<PeerHandle>>,
    queue_capacity: usize,
}

impl RoomRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            queue_capacity,
        }
    }

    /// Join a room, creating it if needed.
    pub fn join(&self, session_id: &SessionId) -> RoomSubscription {
        let peer_id = PeerId::new();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.rooms
            .entry(session_id.clone())
            .or_default()
            .push(PeerHandle {
                id: peer_id.clone(),
                tx,
            });
        tracing::debug!(session_id = %session_id, peer_id = %peer_id, "peer joined room");
        RoomSubscription {
            peer_id,
            receiver: rx,
        }
    }

    /// Leave a room. Unknown room or peer is a no-op; an emptied room is
    /// removed.
    pub fn leave(&self, session_id: &SessionId, peer_id: &PeerId) {
        let mut emptied = false;
        if let Some(mut peers) = self.rooms.get_mut(session_id) {
            peers.retain(|p| &p.id != peer_id);
            emptied = peers.is_empty();
        }
        if emptied {
            self.rooms.remove_if(session_id, |_, peers| peers.is_empty());
            tracing::debug!(session_id = %session_id, "room emptied and removed");
        }
    }

    /// Fan an event out to every peer currently in its room. At-most-once:
    /// no retry, no buffering for late joiners, full or closed peer queues
    /// drop the event for that peer. Returns the number of deliveries; an
    /// unknown room delivers to nobody and is not an error.
    pub fn publish(&self, event: RoomEvent) -> usize {
        let Some(peers) = self.rooms.get(&event.session_id) else {
            tracing::debug!(
                session_id = %event.session_id,
                event_type = event.payload.event_type(),
                "publish to unknown room dropped"
            );
            return 0;
        };

        let mut delivered = 0;
        for peer in peers.iter() {
            match peer.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id = %event.session_id,
                        peer_id = %peer.id,
                        event_type = event.payload.event_type(),
                        "peer queue full, event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self, session_id: &SessionId) -> usize {
        self.rooms.get(session_id).map(|p| p.len()).unwrap_or(0)
    }
}
