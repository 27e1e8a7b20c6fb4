//! Control-character substitution.
//!
//! C0 controls (`U+0000..=U+001F`) and DEL are either replaced by their glyph
//! from the Unicode Control Pictures block or dropped. Complete occurrences of
//! the line-break token pass through untouched; a lone character that merely
//! appears in the token (a bare `\r` under `\r\n`) is treated like any other
//! control character. Input arrives in whole lines or token-free fragments, so
//! nothing is held back beyond a pending marker at the very end of the input.

use crate::newline::DEFAULT_LINE_BREAK;
use core_text::{AnnotatedText, Marker};
use tracing::trace;

const DEL: char = '\u{7f}';
const CONTROL_PICTURES_BASE: u32 = 0x2400;
const DEL_PICTURE: char = '\u{2421}';

fn is_control(c: char) -> bool {
    c < ' ' || c == DEL
}

/// Visible stand-in for a control character.
pub fn control_picture(c: char) -> Option<char> {
    match c {
        DEL => Some(DEL_PICTURE),
        c if c < ' ' => char::from_u32(CONTROL_PICTURES_BASE + c as u32),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ControlCharParser {
    substitute: bool,
    line_break: String,
}

impl Default for ControlCharParser {
    fn default() -> Self {
        Self {
            substitute: false,
            line_break: DEFAULT_LINE_BREAK.to_string(),
        }
    }
}

impl ControlCharParser {
    pub fn new(substitute: bool) -> Self {
        Self {
            substitute,
            ..Self::default()
        }
    }

    pub fn substitute(&self) -> bool {
        self.substitute
    }

    /// `true`: show control characters as glyphs. `false`: drop them.
    pub fn set_substitute(&mut self, substitute: bool) {
        self.substitute = substitute;
    }

    /// Occurrences of `token` pass through unchanged.
    pub fn set_line_break(&mut self, token: &str) {
        self.line_break = token.to_string();
    }

    /// Drain `input` into `output`. Markers on a dropped character move to the
    /// next released one.
    pub fn parse(&self, input: &mut AnnotatedText, output: &mut AnnotatedText) {
        let len = input.len_chars();
        if len == 0 {
            return;
        }
        let text = input.text();
        let base = output.len_chars();
        let mut out = String::with_capacity(text.len());
        let mut out_chars = 0usize;
        let mut markers = input.markers().iter().peekable();
        let mut moved = Vec::new();
        let mut replaced = 0usize;
        let mut dropped = 0usize;
        let token = self.line_break.as_str();
        let token_chars = token.chars().count();
        // Characters left of the line-break token currently being passed through.
        let mut in_token = 0usize;

        for (idx, (byte_idx, c)) in text.char_indices().enumerate() {
            while let Some(m) = markers.next_if(|m| m.char_pos == idx) {
                moved.push(Marker::new(base + out_chars, m.kind));
            }
            if in_token == 0 && !token.is_empty() && text[byte_idx..].starts_with(token) {
                in_token = token_chars;
            }
            let emit = if in_token > 0 {
                in_token -= 1;
                Some(c)
            } else if is_control(c) {
                if self.substitute {
                    replaced += 1;
                    control_picture(c)
                } else {
                    dropped += 1;
                    None
                }
            } else {
                Some(c)
            };
            if let Some(ch) = emit {
                out.push(ch);
                out_chars += 1;
            }
        }

        output.append(&out);
        for m in moved {
            output.insert_marker(m);
        }
        input.remove_front(len);
        if replaced + dropped > 0 {
            trace!(target: "rx.ctrl", replaced, dropped, "control_chars");
        }
    }
}
