//! Cooperative cancellation for dispatch runs.
//!
//! This module provides:
//! - CancellationToken, shared by every adapter of a run
//! - ReleaseGuard, which runs a release callback when an adapter future is
//!   dropped, whether it finished or was aborted

mod guard;
mod token;

pub use guard::ReleaseGuard;
pub use token::CancellationToken;
