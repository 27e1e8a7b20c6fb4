//! Line-oriented streaming filter.
//!
//! Only lines containing at least one pattern match are released. A complete
//! line without a match can never match and is discarded at once; the trailing
//! incomplete line stays in the input buffer until more text arrives or the
//! line completes. Once a match is seen on an incomplete line, the remainder of
//! that physical line is released without re-matching.

use crate::error::PatternError;
use crate::newline::DEFAULT_LINE_BREAK;
use core_text::AnnotatedText;
use regex::Regex;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct StreamingFilter {
    pattern: Option<Regex>,
    line_break: String,
    release_rest_of_line: bool,
}

impl Default for StreamingFilter {
    fn default() -> Self {
        Self {
            pattern: None,
            line_break: DEFAULT_LINE_BREAK.to_string(),
            release_rest_of_line: false,
        }
    }
}

impl StreamingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active pattern source; empty when filtering is off.
    pub fn pattern(&self) -> &str {
        self.pattern.as_ref().map_or("", Regex::as_str)
    }

    /// Compile and install `pattern`. An empty pattern disables filtering. On
    /// error the previous pattern stays active. Success resets line state.
    pub fn set_pattern(&mut self, pattern: &str) -> Result<(), PatternError> {
        self.pattern = if pattern.is_empty() {
            None
        } else {
            let compiled = Regex::new(pattern).map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;
            Some(compiled)
        };
        self.release_rest_of_line = false;
        debug!(target: "rx.filter", active = self.pattern.is_some(), "pattern_set");
        Ok(())
    }

    /// Delimiter used to split input into lines; kept in step with the line-break parser.
    pub fn set_line_break(&mut self, token: &str) {
        self.line_break = token.to_string();
    }

    /// Sticky flag: the current incomplete line already matched.
    pub fn release_rest_of_line(&self) -> bool {
        self.release_rest_of_line
    }

    /// Forget any line-in-progress decision.
    pub fn reset(&mut self) {
        self.release_rest_of_line = false;
    }

    pub fn parse(&mut self, input: &mut AnnotatedText, output: &mut AnnotatedText) {
        let Some(pattern) = self.pattern.as_ref() else {
            let all = input.len_chars();
            input.shift_into(output, all);
            return;
        };
        if input.is_empty() {
            return;
        }

        let mut released = 0usize;
        let mut discarded = 0usize;
        for segment in input.split_at_line_boundaries(&self.line_break) {
            if self.release_rest_of_line {
                input.shift_into(output, segment.char_len);
                released += 1;
                if segment.terminated {
                    self.release_rest_of_line = false;
                }
                continue;
            }

            if pattern.is_match(&segment.text) {
                input.shift_into(output, segment.char_len);
                released += 1;
                if !segment.terminated {
                    self.release_rest_of_line = true;
                }
            } else if segment.terminated {
                input.remove_front_carrying_color(segment.char_len);
                discarded += 1;
            }
            // An unmatched incomplete line is always the last segment; it stays put.
        }
        trace!(
            target: "rx.filter",
            released,
            discarded,
            held = input.len_chars(),
            sticky = self.release_rest_of_line,
            "parsed"
        );
    }
}
