//! Domain layer types and invariants.

pub mod artifact;
pub mod content;
pub mod deployment;
pub mod error;
pub mod slug;
