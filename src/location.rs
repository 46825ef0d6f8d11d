//! Source location of a node within the YAML document.

use std::fmt;

use saphyr_parser::Span;

/// Row/column location within the source YAML document (1-indexed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// 1-indexed row number in the input stream.
    pub(crate) row: u32,
    /// 1-indexed column number in the input stream.
    pub(crate) column: u32,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    ///
    /// Used when an error is raised before the node it concerns is known.
    pub const UNKNOWN: Self = Self { row: 0, column: 0 };

    /// Create a new location record from 1-indexed coordinates.
    pub(crate) const fn new(row: usize, column: usize) -> Self {
        // Error reporting only; documents with more than 4G lines are not a concern.
        Self {
            row: row as u32,
            column: column as u32,
        }
    }

    /// 1-indexed line of the location (0 when unknown).
    pub fn line(&self) -> u64 {
        self.row as u64
    }

    /// 1-indexed column of the location (0 when unknown).
    pub fn column(&self) -> u64 {
        self.column as u64
    }

    /// True unless this is [`Location::UNKNOWN`].
    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.row, self.column)
    }
}

/// Convert a `saphyr_parser::Span` to a 1-indexed `Location`.
///
/// The parser reports 1-indexed lines and 0-indexed columns.
pub(crate) fn location_from_span(span: &Span) -> Location {
    let start = &span.start;
    Location::new(start.line(), start.col() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_location_is_not_known() {
        assert!(!Location::UNKNOWN.is_known());
        assert!(Location::new(1, 1).is_known());
    }

    #[test]
    fn display_prints_line_and_column() {
        let loc = Location::new(3, 7);
        assert_eq!(loc.to_string(), "line 3, column 7");
        assert_eq!(loc.line(), 3);
        assert_eq!(loc.column(), 7);
    }
}
