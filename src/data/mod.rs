//! Data sources for the backtester.
//!
//! Real feature pipelines live upstream; this module provides the seeded
//! synthetic league used by the demo binary and integration tests.

pub mod synthetic;
