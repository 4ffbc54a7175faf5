//! Error types for the wire codec.

use thiserror::Error;

/// Errors raised while decoding a wire-format event.
///
/// Encoding is infallible: `Event`'s fields are `Bytes` at the type level,
/// so a dynamically-typed "tried to encode a non-byte-string field" error
/// has no representable counterpart here -- the type system rules it out.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The byte stream ended before a length-prefixed field could be read in full.
    #[error("truncated event stream: expected {expected} more byte(s), found {found}")]
    Truncated { expected: usize, found: usize },

    /// A property entry was missing its key or value length/payload.
    #[error("truncated property entry at index {index}")]
    TruncatedProperty { index: usize },

    /// The version tag did not match a version this decoder accepts.
    #[error("unsupported event version {major}.{minor}")]
    VersionMismatch { major: u8, minor: u8 },
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
