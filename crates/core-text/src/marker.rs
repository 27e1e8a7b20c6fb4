//! Position-tagged annotations carried alongside streamed text.

use std::time::SystemTime;

/// 24-bit color carried by [`MarkerKind::Color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Applies to every character from this position until the next color marker.
    Color(Rgb),
    /// A line break should be rendered at the start of the delimiter token found here.
    NewLine,
    /// Arrival time of the line starting at this position.
    Timestamp(SystemTime),
}

/// An annotation attached to a character position (0 = before the first character).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub char_pos: usize,
    pub kind: MarkerKind,
}

impl Marker {
    pub const fn new(char_pos: usize, kind: MarkerKind) -> Self {
        Self { char_pos, kind }
    }

    pub fn is_color(&self) -> bool {
        matches!(self.kind, MarkerKind::Color(_))
    }

    pub fn color(&self) -> Option<Rgb> {
        match self.kind {
            MarkerKind::Color(rgb) => Some(rgb),
            _ => None,
        }
    }
}
