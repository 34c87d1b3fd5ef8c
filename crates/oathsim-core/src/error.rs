//! Error types for `oathsim-core`.

use thiserror::Error;

/// Errors produced by the OCRA and HOTP/TOTP engines.
///
/// Every expected failure is returned as data; nothing in this crate panics
/// on malformed caller input.
#[derive(Debug, Error)]
pub enum OcraError {
    /// Suite string fails the `OCRA-1:<CryptoFunction>:<DataInput>` grammar
    /// or one of its range checks.
    #[error("invalid OCRA suite: {0}")]
    InvalidSuiteFormat(String),

    /// A field required by the suite's data input is absent from the
    /// execution context.
    #[error("missing required field: {field}")]
    MissingField {
        /// Context field name.
        field: &'static str,
    },

    /// A field was supplied that the suite does not declare — rejected
    /// rather than silently ignored.
    #[error("field not permitted for suite: {field}")]
    UnexpectedField {
        /// Context field name.
        field: &'static str,
    },

    /// Challenge value incompatible with the declared format or length.
    #[error("invalid challenge: {0}")]
    InvalidChallengeFormat(String),

    /// Session information decoded to the wrong number of bytes.
    #[error("session information must decode to {expected} bytes, got {actual}")]
    InvalidSessionLength {
        /// Byte length declared by the suite's `S` token.
        expected: usize,
        /// Byte length actually decoded from the context.
        actual: usize,
    },

    /// Key or PIN hash material failed to decode or has the wrong length.
    #[error("invalid secret material: {0}")]
    InvalidSecretMaterial(String),

    /// Credential descriptor inputs are inconsistent with the suite
    /// (blank name, counter/PIN permission mismatch, non-positive drift).
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// Malformed pre-computed time-step value.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Hash token outside the supported SHA family. Unreachable past suite
    /// parsing for descriptors built through this crate.
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),
}
