//! Conversation-quality heuristics and text generation.
//!
//! Everything in `confirm`, `accuracy`, `paraphrase`, `topic`, and
//! `hardship` is a pure function over text: no I/O, no clocks, no state.
//! `generate` holds the `TextGenerator` implementations (deterministic
//! templates, an HTTP LLM backend, and a scripted mock for tests) and
//! `emotion` the keyword tagger.

pub mod accuracy;
pub mod confirm;
pub mod emotion;
pub mod generate;
pub mod hardship;
pub mod paraphrase;
pub mod topic;

mod text;

pub use confirm::{classify_confirmation, is_goodbye, Confirmation};
