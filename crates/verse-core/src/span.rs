//! Source location tracking for diagnostics.
//!
//! Nodes carry a [`Span`] pointing back at the text the parser produced them
//! from. Trees assembled in code (built-ins, tests) use [`Span::default`].

use std::fmt;

/// A span of source text, represented by its starting position and length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 when synthesized).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Whether this span was synthesized rather than read from a source.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Extend this span so that it also covers `other`.
    ///
    /// Spans on different lines keep the first position and add lengths.
    pub fn cover(self, other: Span) -> Span {
        if self.is_synthetic() {
            return other;
        }
        if other.is_synthetic() {
            return self;
        }
        if self.line == other.line {
            let start = self.col.min(other.col);
            let end = (self.col + self.len).max(other.col + other.len);
            Span::new(self.line, start, end - start)
        } else {
            Span::new(self.line, self.col, self.len + other.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            f.write_str("<native>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_same_line() {
        let a = Span::new(2, 5, 3);
        let b = Span::new(2, 10, 4);
        assert_eq!(a.cover(b), Span::new(2, 5, 9));
    }

    #[test]
    fn cover_ignores_synthetic() {
        let a = Span::new(1, 1, 2);
        assert_eq!(a.cover(Span::default()), a);
        assert_eq!(Span::default().cover(a), a);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Span::new(3, 7, 1)), "3:7");
        assert_eq!(format!("{}", Span::default()), "<native>");
    }
}
