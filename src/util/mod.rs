//! Utility modules: cancellation deadlines and retry.

pub mod cancel;
pub mod retry;
