//! Raw bytes -> text, per selected decoding mode. Stateless across calls.

use crate::error::EncodingError;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodingMode {
    /// UTF-8 compatible text; control characters are stripped downstream.
    #[default]
    Ascii,
    /// UTF-8 compatible text; control characters are made visible downstream.
    AsciiWithControlChars,
    /// Every byte rendered as two uppercase hex digits and a trailing space.
    Hex,
}

impl DecodingMode {
    /// Control-character substitution implied by this mode, if the mode
    /// implies one at all.
    pub fn control_char_substitution(self) -> Option<bool> {
        match self {
            DecodingMode::Ascii => Some(false),
            DecodingMode::AsciiWithControlChars => Some(true),
            DecodingMode::Hex => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Decoder {
    mode: DecodingMode,
}

impl Decoder {
    pub fn new(mode: DecodingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DecodingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DecodingMode) {
        self.mode = mode;
    }

    /// Decode, failing on the first byte sequence that is invalid for the mode.
    pub fn decode_strict(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        match self.mode {
            DecodingMode::Ascii | DecodingMode::AsciiWithControlChars => {
                std::str::from_utf8(bytes)
                    .map(str::to_owned)
                    .map_err(|e| EncodingError {
                        mode: self.mode,
                        valid_up_to: e.valid_up_to(),
                    })
            }
            DecodingMode::Hex => Ok(to_hex(bytes)),
        }
    }

    /// Decode, substituting U+FFFD for malformed input rather than failing.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.decode_strict(bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    target: "rx.decode",
                    len = bytes.len(),
                    valid_up_to = err.valid_up_to,
                    "malformed_input_substituted"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 3), |mut out, b| {
            out.push_str(&format!("{b:02X} "));
            out
        })
}
