//! Shared storage contract tests.
//!
//! Tests the metadata query contract against all adapters. Each adapter's
//! test binary imports these functions and runs them; identical outcomes
//! across adapters are the portability guarantee.

pub mod metadata_query_tests;
