//! Room-scoped publish/subscribe relay.
//!
//! Pure infrastructure: rooms are named by session id, peers join and
//! leave, publishes fan out to current members at-most-once. The relay
//! knows nothing about conversation semantics.

mod room;

pub use room::{RoomRegistry, RoomSubscription};
