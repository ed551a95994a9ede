//! Testing utilities for marple searches.
//!
//! This module provides engine adapter doubles: fixed result lists,
//! failures, slow or stalling engines and query recording.

mod mocks;

pub use mocks::{
    hit, FailingAdapter, RecordingAdapter, SlowAdapter, StaticAdapter,
};
