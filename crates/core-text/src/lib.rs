//! Rope-backed annotated text: the currency passed between RX processing stages.
//!
//! An [`AnnotatedText`] holds characters plus an ordered list of [`Marker`]s.
//! Every marker position is a character index into the current text, and the
//! list is kept sorted by position (ties keep insertion order). Stages hand data
//! to each other with [`AnnotatedText::shift_into`], which moves a decided prefix
//! together with its markers and re-bases whatever stays behind.
//!
//! A color marker sitting exactly at the end of the text is "pending": it colors
//! the next character appended. Prefix operations never move or drop a marker
//! at the cut position, so a pending color stays attached to what follows it.

use ropey::Rope;
use tracing::trace;

pub mod marker;
pub mod segment;

pub use marker::{Marker, MarkerKind, Rgb};
pub use segment::{LineSegment, LineSegments};

#[derive(Debug, Clone)]
pub struct AnnotatedText {
    rope: Rope,
    markers: Vec<Marker>,
}

impl Default for AnnotatedText {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for AnnotatedText {
    fn from(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            markers: Vec::new(),
        }
    }
}

impl AnnotatedText {
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            markers: Vec::new(),
        }
    }

    /// Number of characters currently held.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Owned copy of the current text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Color markers only, in position order.
    pub fn colors(&self) -> impl Iterator<Item = (usize, Rgb)> + '_ {
        self.markers
            .iter()
            .filter_map(|m| m.color().map(|c| (m.char_pos, c)))
    }

    /// Positions of all `NewLine` markers.
    pub fn new_line_positions(&self) -> Vec<usize> {
        self.markers
            .iter()
            .filter(|m| m.kind == MarkerKind::NewLine)
            .map(|m| m.char_pos)
            .collect()
    }

    /// Extend the text. Markers are untouched.
    pub fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let end = self.rope.len_chars();
        self.rope.insert(end, text);
    }

    /// Insert a marker, keeping position order stable (after any existing
    /// markers at the same position).
    pub fn insert_marker(&mut self, marker: Marker) {
        debug_assert!(
            marker.char_pos <= self.len_chars(),
            "marker inserted past end of text"
        );
        let idx = self
            .markers
            .partition_point(|m| m.char_pos <= marker.char_pos);
        self.markers.insert(idx, marker);
    }

    /// Append a marker at the current end of the text.
    pub fn push_marker(&mut self, kind: MarkerKind) {
        let end = self.len_chars();
        self.markers.push(Marker::new(end, kind));
    }

    /// Set the color applied to the next appended character, replacing an
    /// existing pending color marker instead of stacking another one.
    pub fn set_color_at_end(&mut self, color: Rgb) {
        let end = self.len_chars();
        if let Some(last) = self.markers.last_mut()
            && last.char_pos == end
            && last.is_color()
        {
            last.kind = MarkerKind::Color(color);
            return;
        }
        self.markers.push(Marker::new(end, MarkerKind::Color(color)));
    }

    /// Move the first `n` characters, and every marker positioned before `n`,
    /// onto the end of `other`. Markers left behind are re-based by `-n`.
    pub fn shift_into(&mut self, other: &mut AnnotatedText, n: usize) {
        let n = self.clamp_count(n);
        if n == 0 {
            return;
        }
        self.copy_prefix_into(other, n);
        self.drop_prefix(n);
    }

    /// Like [`shift_into`](Self::shift_into) but leaves this buffer untouched.
    pub fn copy_into(&self, other: &mut AnnotatedText, n: usize) {
        let n = self.clamp_count(n);
        if n == 0 {
            return;
        }
        self.copy_prefix_into(other, n);
    }

    /// Discard the first `n` characters without forwarding them. Markers before
    /// `n` are dropped; the rest are re-based.
    pub fn remove_front(&mut self, n: usize) {
        let n = self.clamp_count(n);
        if n == 0 {
            return;
        }
        self.drop_prefix(n);
    }

    /// Same as [`remove_front`](Self::remove_front), except the last color that
    /// was active inside the removed prefix is carried forward to position 0, so
    /// the text that remains keeps rendering in the right color.
    pub fn remove_front_carrying_color(&mut self, n: usize) {
        let n = self.clamp_count(n);
        if n == 0 {
            return;
        }
        let carried = self
            .markers
            .iter()
            .take_while(|m| m.char_pos < n)
            .filter_map(Marker::color)
            .last();
        self.drop_prefix(n);
        if let Some(color) = carried {
            self.markers
                .insert(0, Marker::new(0, MarkerKind::Color(color)));
        }
    }

    /// Trim the oldest characters so at most `max_len` remain. Returns how many
    /// characters were removed.
    pub fn trim_front_to(&mut self, max_len: usize) -> usize {
        let len = self.len_chars();
        if len <= max_len {
            return 0;
        }
        let excess = len - max_len;
        self.drop_prefix(excess);
        trace!(target: "text.trim", removed = excess, retained = max_len, "trim_front");
        excess
    }

    /// Drop all text and markers.
    pub fn clear(&mut self) {
        self.rope = Rope::new();
        self.markers.clear();
    }

    /// Split the current text immediately after each occurrence of `token`.
    /// The result is a snapshot: mutating the buffer does not disturb iteration.
    pub fn split_at_line_boundaries(&self, token: &str) -> LineSegments {
        LineSegments::new(self.text(), token)
    }

    /// `true` when markers are ordered and all lie within `0..=len_chars()`.
    pub fn invariants_hold(&self) -> bool {
        let len = self.len_chars();
        self.markers.iter().all(|m| m.char_pos <= len)
            && self
                .markers
                .windows(2)
                .all(|w| w[0].char_pos <= w[1].char_pos)
    }

    fn clamp_count(&self, n: usize) -> usize {
        let len = self.len_chars();
        debug_assert!(n <= len, "prefix length {n} exceeds text length {len}");
        n.min(len)
    }

    fn copy_prefix_into(&self, other: &mut AnnotatedText, n: usize) {
        let base = other.len_chars();
        for chunk in self.rope.slice(..n).chunks() {
            other.append(chunk);
        }
        other.markers.extend(
            self.markers
                .iter()
                .take_while(|m| m.char_pos < n)
                .map(|m| Marker::new(m.char_pos + base, m.kind)),
        );
        debug_assert!(other.invariants_hold(), "marker invariant violated");
    }

    fn drop_prefix(&mut self, n: usize) {
        self.rope.remove(..n);
        let moved = self.markers.partition_point(|m| m.char_pos < n);
        self.markers.drain(..moved);
        for m in &mut self.markers {
            m.char_pos -= n;
        }
        debug_assert!(self.invariants_hold(), "marker invariant violated");
    }
}
