//! Shared infrastructure for the argus workspace: single-shot fan-in
//! barriers over push channels, and parsing/serde helpers for configuration.

pub mod fanin;
pub mod parsers;
pub mod serde;

pub use fanin::{deep_merge, CollectBarrier, FuseBarrier};
