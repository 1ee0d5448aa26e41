//! Chain-facing error taxonomy shared by every crate that talks to the
//! local validator.

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The request never reached the node (connection refused, DNS, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node answered, but the payload did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}
