//! A1-style cell and range references

use crate::error::{ExportError, Result};
use nom::{
    bytes::complete::take_while1,
    character::complete::{alpha0, char, digit1},
    combinator::{opt, recognize},
    IResult, Parser,
};
use std::fmt;

/// Largest column index Excel accepts (`XFD`)
pub const MAX_COLUMN: u16 = 16_383;

/// A single cell position. Rows are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

/// Parse column letters, allowing a leading `$`
fn column_part(input: &str) -> IResult<&str, &str> {
    let (input, _) = opt(char('$')).parse(input)?;
    take_while1(|c: char| c.is_ascii_alphabetic()).parse(input)
}

/// Parse row digits, allowing a leading `$`
fn row_part(input: &str) -> IResult<&str, &str> {
    let (input, _) = opt(char('$')).parse(input)?;
    digit1.parse(input)
}

fn cell_ref(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, col) = column_part(input)?;
    let (input, row) = row_part(input)?;
    Ok((input, (col, row)))
}

/// Convert column letters (`"A"`, `"AB"`) to a 0-based index
pub fn column_index(letters: &str) -> Option<u16> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let index = index - 1;
    if index > MAX_COLUMN as u32 {
        return None;
    }
    Some(index as u16)
}

/// Convert a 0-based column index to letters
pub fn column_name(col: u16) -> String {
    let mut n = col as u32 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl CellRef {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || ExportError::InvalidCellRef(s.to_string());
        let (rest, (col, row)) = cell_ref(s.trim()).map_err(|_| invalid())?;
        if !rest.is_empty() {
            return Err(invalid());
        }
        let col = column_index(col).ok_or_else(invalid)?;
        let row: u32 = row.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(CellRef { row, col })
    }

    pub fn to_a1(&self) -> String {
        format!("{}{}", column_name(self.col), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// A rectangular range such as `A1:E12`; a single cell is a 1x1 range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((start, end)) => Ok(CellRange {
                start: CellRef::parse(start)?,
                end: CellRef::parse(end)?,
            }),
            None => {
                let cell = CellRef::parse(s)?;
                Ok(CellRange {
                    start: cell,
                    end: cell,
                })
            }
        }
    }

    /// Apply a row insertion of `count` rows at `at`.
    ///
    /// Ranges that straddle the insertion point grow.
    pub fn shift_rows(&self, at: u32, count: u32) -> Self {
        let shift = |r: u32| if r >= at { r + count } else { r };
        CellRange {
            start: CellRef::new(shift(self.start.row), self.start.col),
            end: CellRef::new(shift(self.end.row), self.end.col),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Shift every reference in a space-separated `sqref` list.
///
/// Tokens that are not cell ranges (whole rows or columns) are kept as is.
pub fn shift_reference_list(list: &str, at: u32, count: u32) -> String {
    list.split_whitespace()
        .map(|token| match CellRange::parse(token) {
            Ok(range) => range.shift_rows(at, count).to_string(),
            Err(_) => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Column part with its `$` markers, then the row digits: `$A$7` gives `("$A$", "7")`
fn row_anchor(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, prefix) = recognize((opt(char('$')), alpha0, opt(char('$')))).parse(input)?;
    let (input, row) = digit1.parse(input)?;
    Ok((input, (prefix, row)))
}

/// Shift the rows of an absolute-style reference such as `$A$1:$E$40` or
/// `$1:$3`, keeping its `$` markers.
///
/// Column-only parts (`$A:$E`) and anything unparseable are left unchanged.
pub fn shift_anchored_reference(reference: &str, at: u32, count: u32) -> String {
    reference
        .split(':')
        .map(|part| match row_anchor(part) {
            Ok(("", (prefix, digits))) => match digits.parse::<u32>() {
                Ok(row) if row >= at => format!("{}{}", prefix, row + count),
                _ => part.to_string(),
            },
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(":")
}
