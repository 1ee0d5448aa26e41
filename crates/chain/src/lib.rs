//! Interface boundary to the target network.
//!
//! The bootstrap pipeline never speaks to the validator directly; every
//! on-chain effect goes through the [`client::ChainClient`] trait. The
//! production implementation is [`rpc::RpcChain`] (JSON-RPC over HTTP);
//! tests use [`mock::MockChain`].

pub mod client;
pub mod registry;
pub mod rpc;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
