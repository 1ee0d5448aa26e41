//! Localnet bootstrap and readiness orchestration.
//!
//! Drives a fresh validator environment to a protocol-ready state:
//! provision an authority, apply declarative configuration, set up the
//! lookup-table registry, start the oracle mirror, gate on readiness,
//! and trigger dependent builds. See [`pipeline::Pipeline`] for the
//! stage ordering and failure semantics.

pub mod build_trigger;
pub mod config;
pub mod gate;
pub mod pipeline;
pub mod stages;
