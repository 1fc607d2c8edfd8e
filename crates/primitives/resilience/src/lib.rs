//! Bounded retry policy for per-instance state reads.
//!
//! Each fetch task owns one [`RetryState`]; nothing here is shared across
//! tasks. The policy is deliberately simple: a hard attempt ceiling with a
//! fixed backoff between tries. Both knobs are configurable, defaulting to
//! the values the service has always run with.

mod retry;

pub use retry::{RetryConfig, RetryState};
