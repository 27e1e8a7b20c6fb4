//! Line segmentation over a fixed snapshot of buffer text.
//!
//! Segments end immediately after each occurrence of the delimiter token; the
//! final segment is whatever follows the last token (omitted when empty).
//! Concatenating every segment reproduces the input exactly.

/// One line (or trailing line fragment) produced by [`LineSegments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSegment {
    pub text: String,
    /// Length in characters, which is the unit buffer operations take.
    pub char_len: usize,
    /// `true` when the segment ends with the delimiter token (a complete line).
    pub terminated: bool,
}

/// Lazy iterator of [`LineSegment`]s. Owns its text snapshot, so it stays valid
/// while the buffer it was taken from is mutated.
#[derive(Debug, Clone)]
pub struct LineSegments {
    text: String,
    token: String,
    offset: usize,
}

impl LineSegments {
    pub fn new(text: String, token: &str) -> Self {
        Self {
            text,
            token: token.to_string(),
            offset: 0,
        }
    }
}

impl Iterator for LineSegments {
    type Item = LineSegment;

    fn next(&mut self) -> Option<LineSegment> {
        if self.offset >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.offset..];
        let (end, terminated) = match (self.token.is_empty(), rest.find(self.token.as_str())) {
            (false, Some(idx)) => (idx + self.token.len(), true),
            _ => (rest.len(), false),
        };
        let seg = &rest[..end];
        self.offset += end;
        Some(LineSegment {
            text: seg.to_string(),
            char_len: seg.chars().count(),
            terminated,
        })
    }
}
