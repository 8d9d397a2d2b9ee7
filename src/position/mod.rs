//! Source offset to line/column resolution
//!
//! Architecture: Pure Functions - position resolution knows nothing about rules or models
//! - `resolve` scans the text up to the offset
//! - `LineIndex` precomputes newline offsets and answers with a binary search
//! - Both agree on every input; only `\n` ends a line, `\r` counts as a column
//!
//! Offsets and columns count UTF-16 code units, the unit javac positions use.
//! A character outside the BMP is two units wide. An offset past the end of the
//! text is rejected with `OffsetOutOfRange`.

use crate::domain::violations::{GuardianError, GuardianResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based line and column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.line, self.column)
    }
}

/// Resolve `offset` within `text` by scanning every code unit before it
pub fn resolve(text: &str, offset: usize) -> GuardianResult<Position> {
    let mut line: usize = 1;
    let mut column: usize = 1;
    let mut scanned = 0;

    for ch in text.chars() {
        if scanned >= offset {
            break;
        }
        // An offset inside a surrogate pair only counts the units before it
        let units = ch.len_utf16().min(offset - scanned);
        scanned += units;
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += units;
        }
    }

    if scanned < offset {
        return Err(GuardianError::OffsetOutOfRange {
            offset,
            length: scanned,
        });
    }

    Ok(Position {
        line: saturating_u32(line),
        column: saturating_u32(column),
    })
}

/// Newline table for one text, built once and queried in O(log n)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    /// UTF-16 offsets of every `\n`, ascending
    newlines: Vec<usize>,
    len_utf16: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut newlines = Vec::new();
        let mut len_utf16 = 0;

        for ch in text.chars() {
            if ch == '\n' {
                newlines.push(len_utf16);
            }
            len_utf16 += ch.len_utf16();
        }

        Self { newlines, len_utf16 }
    }

    /// Length of the text in UTF-16 code units
    pub fn len_utf16(&self) -> usize {
        self.len_utf16
    }

    pub fn line_count(&self) -> usize {
        self.newlines.len() + 1
    }

    pub fn position(&self, offset: usize) -> GuardianResult<Position> {
        if offset > self.len_utf16 {
            return Err(GuardianError::OffsetOutOfRange {
                offset,
                length: self.len_utf16,
            });
        }

        // Newlines strictly before the offset; a newline at the offset itself
        // still belongs to the current line.
        let preceding = self.newlines.partition_point(|&newline| newline < offset);
        let line_start = match preceding {
            0 => 0,
            n => self.newlines[n - 1] + 1,
        };

        Ok(Position {
            line: saturating_u32(preceding + 1),
            column: saturating_u32(offset - line_start + 1),
        })
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ab\ncd", 0, 1, 1)]
    #[case("ab\ncd", 1, 1, 2)]
    #[case("ab\ncd", 2, 1, 3)]
    #[case("ab\ncd", 3, 2, 1)]
    #[case("ab\ncd", 5, 2, 3)]
    #[case("\n\n\n", 3, 4, 1)]
    #[case("a\r\nb", 3, 2, 1)]
    #[case("a\r\nb", 2, 1, 3)]
    #[case("é\nü x", 4, 2, 3)]
    #[case("", 0, 1, 1)]
    #[case("// \u{1F600}\n  Repo r;", 8, 2, 3)]
    #[case("a\u{1F600}b", 3, 1, 4)]
    #[case("a\u{1F600}b", 2, 1, 3)]
    fn test_resolve_cases(
        #[case] text: &str,
        #[case] offset: usize,
        #[case] line: u32,
        #[case] column: u32,
    ) {
        let expected = Position { line, column };

        assert_eq!(resolve(text, offset).unwrap(), expected);
        assert_eq!(LineIndex::new(text).position(offset).unwrap(), expected);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let text = "class A {\n  Repo repo;\n}\n";

        assert_eq!(resolve(text, 14).unwrap(), resolve(text, 14).unwrap());
    }

    #[test]
    fn test_every_offset_agrees_and_is_positive() {
        let text = "package a;\n\n@Component\nclass A {\r\n\tRepo r; // \u{1F4E6}\n}\nü";
        let index = LineIndex::new(text);
        let length = text.encode_utf16().count();

        for offset in 0..=length {
            let scanned = resolve(text, offset).unwrap();
            assert!(scanned.line >= 1 && scanned.column >= 1);
            assert_eq!(index.position(offset).unwrap(), scanned, "offset {offset}");
        }
    }

    #[test]
    fn test_offset_out_of_range() {
        let err = resolve("abc", 4).unwrap_err();
        assert!(matches!(err, GuardianError::OffsetOutOfRange { offset: 4, length: 3 }));

        let err = LineIndex::new("abc").position(10).unwrap_err();
        assert!(matches!(err, GuardianError::OffsetOutOfRange { offset: 10, length: 3 }));
    }

    #[test]
    fn test_line_index_counts() {
        let index = LineIndex::new("a\nb\nc");

        assert_eq!(index.len_utf16(), 5);
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_supplementary_characters_take_two_units() {
        let text = "x\u{1F600}";

        assert_eq!(LineIndex::new(text).len_utf16(), 3);
        assert_eq!(resolve(text, 3).unwrap(), Position { line: 1, column: 4 });
        assert!(matches!(
            resolve(text, 4).unwrap_err(),
            GuardianError::OffsetOutOfRange { offset: 4, length: 3 }
        ));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position { line: 3, column: 9 }.to_string(), "[3,9]");
        assert_eq!(Position::START, Position { line: 1, column: 1 });
    }
}
