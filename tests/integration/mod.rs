//! Integration test suite for Burrow
//!
//! End-to-end tests of the self-update flow against a mock GitHub API, plus
//! smoke tests of the `burrow` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **update_flow**: resolve → confirm → download → replace against wiremock
//! - **cli**: argument parsing, configuration and error output of the binary

mod cli;
mod update_flow;
