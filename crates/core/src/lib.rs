//! Shared domain types for the airlift bootstrap pipeline.
//!
//! This crate is the leaf of the workspace: error taxonomy, network
//! descriptors, authority credentials, retry policy, and the readiness
//! sentinel. It performs no network I/O; the only side effects are
//! credential and sentinel files on the local filesystem.

pub mod backoff;
pub mod error;
pub mod keypair;
pub mod network;
pub mod sentinel;
