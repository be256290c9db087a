//! Instrumentation shared by the unit tests.

pub mod crash_test;
pub mod recording;
