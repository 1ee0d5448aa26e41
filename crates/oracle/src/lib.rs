//! Price-oracle mirroring.
//!
//! Reads price feeds from a remote source network and mirrors them
//! into oracle accounts on the local network, as a supervised
//! long-running task with an explicit start/ready/shutdown contract.

pub mod mirror;
pub mod source;
