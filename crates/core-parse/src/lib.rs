//! Streaming RX parsers.
//!
//! Each stage is a small state machine that may hold back an undecided suffix
//! of its input between calls and releases only the prefix it has fully
//! decided about. Stages share no state; the holdback each one keeps is
//! exposed through an accessor so it can be inspected in isolation.
//!
//! Order of use: [`Decoder`] -> [`AnsiParser`] -> [`NewLineParser`] ->
//! [`StreamingFilter`] -> [`ControlCharParser`].

pub mod ansi;
pub mod control;
pub mod decode;
pub mod error;
pub mod filter;
pub mod newline;

pub use ansi::AnsiParser;
pub use control::ControlCharParser;
pub use decode::{Decoder, DecodingMode};
pub use error::{ConfigError, EncodingError, PatternError};
pub use filter::StreamingFilter;
pub use newline::NewLineParser;
