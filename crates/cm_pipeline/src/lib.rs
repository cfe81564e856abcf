//! cm_pipeline — deterministic orchestration of the CM engine
//! (ingest votes → moderate → project → cluster → repness → consensus →
//! document).
//!
//! One `Conversation` owns all mutable state for a single conversation and
//! is driven synchronously on the calling thread; parallelism across
//! conversations belongs to the host. Each numeric stage is fail-soft: on a
//! numeric failure it logs, substitutes its empty-input result, and later
//! stages still produce the canonical document schema.

#![forbid(unsafe_code)]

pub mod conversation;

pub use conversation::{Conversation, ConversationSummary, VoteIngestStats};
