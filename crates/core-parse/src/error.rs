use crate::decode::DecodingMode;
use thiserror::Error;

/// Received bytes are not valid under the selected decoding mode.
///
/// Only surfaced by [`Decoder::decode_strict`](crate::Decoder::decode_strict);
/// the streaming path substitutes replacement characters instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {mode:?} input: only the first {valid_up_to} bytes decode")]
pub struct EncodingError {
    pub mode: DecodingMode,
    pub valid_up_to: usize,
}

/// A filter pattern that failed to compile. The previously active pattern is kept.
#[derive(Debug, Clone, Error)]
#[error("invalid filter pattern {pattern:?}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Rejected configuration change.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("line-break token must not be empty")]
    EmptyLineBreak,
    #[error(transparent)]
    Pattern(#[from] PatternError),
}
