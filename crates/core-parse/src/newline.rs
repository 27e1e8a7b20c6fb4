//! Line-break detection.
//!
//! Marks every occurrence of the delimiter token with a `NewLine` marker at
//! the token's first character. The token itself stays in the text. A suffix
//! that is a strict prefix of the token is withheld until the next call, so a
//! token split across chunks is still found exactly once.

use crate::error::ConfigError;
use core_text::{AnnotatedText, Marker, MarkerKind};
use std::time::SystemTime;
use tracing::trace;

pub const DEFAULT_LINE_BREAK: &str = "\n";

#[derive(Debug, Clone)]
pub struct NewLineParser {
    token: String,
    withheld: AnnotatedText,
    timestamps: bool,
    line_start_pending: bool,
}

impl Default for NewLineParser {
    fn default() -> Self {
        Self {
            token: DEFAULT_LINE_BREAK.to_string(),
            withheld: AnnotatedText::new(),
            timestamps: false,
            line_start_pending: true,
        }
    }
}

impl NewLineParser {
    pub fn new(token: &str) -> Result<Self, ConfigError> {
        let mut parser = Self::default();
        parser.set_token(token)?;
        Ok(parser)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Text held back because it may be the start of a token.
    pub fn withheld(&self) -> &AnnotatedText {
        &self.withheld
    }

    /// Replace the delimiter. Matching restarts from scratch: withheld text is
    /// kept and rescanned against the new token on the next call.
    pub fn set_token(&mut self, token: &str) -> Result<(), ConfigError> {
        if token.is_empty() {
            return Err(ConfigError::EmptyLineBreak);
        }
        self.token = token.to_string();
        Ok(())
    }

    /// Emit a `Timestamp` marker at the start of every line.
    pub fn set_timestamps(&mut self, enabled: bool) {
        self.timestamps = enabled;
    }

    /// Drain `input`, releasing every decided character into `output`.
    pub fn parse(&mut self, input: &mut AnnotatedText, output: &mut AnnotatedText) {
        let incoming = input.len_chars();
        input.shift_into(&mut self.withheld, incoming);
        if self.withheld.is_empty() {
            return;
        }

        let text = self.withheld.text();
        let token_chars = self.token.chars().count();
        let mut token_starts = Vec::new();
        let mut scanned_bytes = 0;
        let mut scanned_chars = 0;
        let mut after_last_token = 0;
        for (byte_idx, _) in text.match_indices(self.token.as_str()) {
            scanned_chars += text[scanned_bytes..byte_idx].chars().count();
            scanned_bytes = byte_idx;
            token_starts.push(scanned_chars);
            after_last_token = byte_idx + self.token.len();
        }

        let hold_bytes = partial_token_suffix(&text[after_last_token..], &self.token);
        let release = text[..text.len() - hold_bytes].chars().count();
        if release == 0 {
            trace!(target: "rx.newline", withheld = self.withheld.len_chars(), "nothing_released");
            return;
        }

        let now = SystemTime::now();
        if self.timestamps && self.line_start_pending {
            self.withheld
                .insert_marker(Marker::new(0, MarkerKind::Timestamp(now)));
        }
        for &start in &token_starts {
            self.withheld
                .insert_marker(Marker::new(start, MarkerKind::NewLine));
            let next_line = start + token_chars;
            if self.timestamps && next_line < release {
                self.withheld
                    .insert_marker(Marker::new(next_line, MarkerKind::Timestamp(now)));
            }
        }
        self.line_start_pending = token_starts
            .last()
            .is_some_and(|start| start + token_chars == release);

        self.withheld.shift_into(output, release);
        trace!(
            target: "rx.newline",
            released = release,
            new_lines = token_starts.len(),
            withheld = self.withheld.len_chars(),
            "parsed"
        );
    }
}

/// Byte length of the longest suffix of `tail` that is a strict prefix of `token`.
fn partial_token_suffix(tail: &str, token: &str) -> usize {
    token
        .char_indices()
        .map(|(idx, _)| idx)
        .filter(|idx| *idx > 0)
        .rev()
        .find(|idx| tail.ends_with(&token[..*idx]))
        .unwrap_or(0)
}
