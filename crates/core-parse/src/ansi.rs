//! ANSI color escape-code parser.
//!
//! Recognizes `ESC [ <params> m` where `<params>` is a `;`-separated list of
//! decimal numbers. A single number selects a normal color, `<n>;1` selects the
//! bold variant; anything else is an unsupported sequence and is swallowed
//! without producing output. A trailing fragment that could still grow into a
//! valid sequence is withheld until the next call.

use core_text::{AnnotatedText, Rgb};
use tracing::trace;

const ESC: u8 = 0x1b;

/// Codes 30..=37.
const NORMAL_COLORS: [Rgb; 8] = [
    Rgb::new(0, 0, 0),
    Rgb::new(170, 0, 0),
    Rgb::new(0, 170, 0),
    Rgb::new(170, 85, 0),
    Rgb::new(0, 0, 170),
    Rgb::new(170, 0, 170),
    Rgb::new(0, 170, 170),
    Rgb::new(170, 170, 170),
];

/// Codes 30..=37 followed by `;1`.
const BOLD_COLORS: [Rgb; 8] = [
    Rgb::new(85, 85, 85),
    Rgb::new(255, 85, 85),
    Rgb::new(85, 255, 85),
    Rgb::new(255, 255, 85),
    Rgb::new(85, 85, 225),
    Rgb::new(255, 85, 255),
    Rgb::new(85, 255, 255),
    Rgb::new(255, 255, 255),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// Full sequence of the given byte length.
    Complete(usize),
    /// Input ends inside what may still become a sequence.
    Partial,
    /// The ESC byte does not start a sequence of this grammar.
    NotEscape,
}

fn scan_sequence(bytes: &[u8]) -> Scan {
    debug_assert_eq!(bytes.first(), Some(&ESC));
    match bytes.get(1) {
        None => return Scan::Partial,
        Some(b'[') => {}
        Some(_) => return Scan::NotEscape,
    }
    let params = bytes[2..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b';')
        .count();
    match bytes.get(2 + params) {
        None => Scan::Partial,
        Some(b'm') => Scan::Complete(params + 3),
        Some(_) => Scan::NotEscape,
    }
}

fn table_index(code: &str) -> Option<usize> {
    match code.as_bytes() {
        [b'3', d @ b'0'..=b'7'] => Some(usize::from(d - b'0')),
        _ => None,
    }
}

/// Map the parameter list of a complete sequence to a color, or `None` when
/// the sequence is unsupported.
pub fn color_for_params(params: &str) -> Option<Rgb> {
    let codes: Vec<&str> = params.split(';').collect();
    match codes.as_slice() {
        [code] => table_index(code).map(|i| NORMAL_COLORS[i]),
        [code, "1"] => table_index(code).map(|i| BOLD_COLORS[i]),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct AnsiParser {
    withheld: String,
    enabled: bool,
    unsupported: u64,
}

impl Default for AnsiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiParser {
    pub fn new() -> Self {
        Self {
            withheld: String::new(),
            enabled: true,
            unsupported: 0,
        }
    }

    /// Partial escape sequence carried over from the previous call.
    pub fn withheld(&self) -> &str {
        &self.withheld
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// When disabled, input (and any withheld fragment) passes through verbatim.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Number of well-formed but unsupported sequences swallowed so far.
    pub fn unsupported_count(&self) -> u64 {
        self.unsupported
    }

    /// Parse `input`, appending released text and color markers to `output`.
    pub fn parse(&mut self, input: &str, output: &mut AnnotatedText) {
        if input.is_empty() && (self.enabled || self.withheld.is_empty()) {
            return;
        }
        let mut combined = std::mem::take(&mut self.withheld);
        combined.push_str(input);
        if !self.enabled {
            output.append(&combined);
            return;
        }

        let bytes = combined.as_bytes();
        let mut released = 0;
        let mut cursor = 0;
        while let Some(offset) = bytes[cursor..].iter().position(|b| *b == ESC) {
            let start = cursor + offset;
            match scan_sequence(&bytes[start..]) {
                Scan::Complete(len) => {
                    output.append(&combined[released..start]);
                    let params = &combined[start + 2..start + len - 1];
                    match color_for_params(params) {
                        Some(color) => output.set_color_at_end(color),
                        None => {
                            self.unsupported += 1;
                            trace!(target: "rx.ansi", seq_len = len, "unsupported_sequence");
                        }
                    }
                    cursor = start + len;
                    released = cursor;
                }
                Scan::Partial => {
                    output.append(&combined[released..start]);
                    self.withheld = combined[start..].to_string();
                    trace!(target: "rx.ansi", withheld = self.withheld.len(), "partial_withheld");
                    return;
                }
                Scan::NotEscape => cursor = start + 1,
            }
        }
        output.append(&combined[released..]);
    }
}
