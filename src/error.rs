//! Error taxonomy for the metadata index.
//!
//! One crate-wide enum: replay-time handler failures are logged and
//! swallowed by the engine, query failures surface to callers unchanged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Malformed event payload, wrong concrete type for a tag, or an input
    /// that fails a pre-validated size check.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Bytes that do not decode as the expected wire form or key shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Lookup by device key found nothing.
    #[error("missing input")]
    MissingInput,

    /// Lookup by map key found nothing.
    #[error("missing map key")]
    MissingMapKey,

    /// Operation attempted in a group whose type disallows it.
    #[error("invalid group type for operation")]
    GroupInvalidType,

    /// Impossible condition or post-action failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Encoding a value to its wire form failed.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
