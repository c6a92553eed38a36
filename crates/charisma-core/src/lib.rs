//! Core types shared across the Charisma workspace: branded IDs, the
//! room-event taxonomy, conversation roles, transcript/snapshot types,
//! session configuration, and the narrow collaborator traits.

pub mod collab;
pub mod config;
pub mod events;
pub mod ids;
pub mod roles;
pub mod transcript;
