//! Locating bow-style headings in the results sheet

use crate::model::Ordinal;
use crate::xlsx::Worksheet;
use regex::Regex;

lazy_static::lazy_static! {
    /// `"04. Barebow Recurve (BBR)"`: two digits, a period, whitespace, the name
    /// and a trailing parenthetical
    static ref HEADING_PATTERN: Regex = Regex::new(r"^(\d{2})\.\s+(.+)\s*\(.*\)?$").unwrap();
}

/// A heading row found in the template
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub row: u32,
    pub ordinal: Ordinal,
    pub text: String,
}

/// Ordinal announced by a heading cell, or `None` if the text is not a heading
pub fn parse_heading(text: &str) -> Option<Ordinal> {
    let caps = HEADING_PATTERN.captures(text)?;
    Ordinal::parse(&caps[1]).ok()
}

/// Find the heading row for `ordinal`, scanning down from `from_row`.
///
/// Returns `None` when the template has no heading for it below `from_row`.
pub fn find_heading(sheet: &Worksheet, column: u16, ordinal: Ordinal, from_row: u32) -> Option<u32> {
    (from_row.max(1)..=sheet.last_row()).find(|&row| {
        sheet
            .cell_text(row, column)
            .and_then(|text| parse_heading(&text))
            == Some(ordinal)
    })
}

/// Every heading in the sheet, top to bottom
pub fn list_headings(sheet: &Worksheet, column: u16) -> Vec<Heading> {
    (1..=sheet.last_row())
        .filter_map(|row| {
            let text = sheet.cell_text(row, column)?;
            let ordinal = parse_heading(&text)?;
            Some(Heading { row, ordinal, text })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::Workbook;

    #[test]
    fn test_parse_heading() {
        assert_eq!(parse_heading("04. Barebow Recurve (BBR)").map(|o| o.value()), Some(4));
        assert_eq!(parse_heading("12.  Historical Bow (HB)").map(|o| o.value()), Some(12));
        assert_eq!(parse_heading("10. Longbow (LB"), Ordinal::parse("10").ok());
        assert_eq!(parse_heading("4. Barebow Recurve (BBR)"), None);
        assert_eq!(parse_heading("04 Barebow Recurve (BBR)"), None);
        assert_eq!(parse_heading("04. Barebow Recurve"), None);
        assert_eq!(parse_heading("Host club"), None);
    }

    fn sheet_with_headings(headings: &[(u32, &str)]) -> Workbook {
        let layout = crate::export::TemplateLayout::default();
        let mut workbook = Workbook::from_bytes(&crate::template::tests::blank_template(&layout)).unwrap();
        let sheet = workbook.worksheet_mut(&layout.sheet_name).unwrap();
        for (row, text) in headings {
            sheet.set_text(*row, 0, text);
        }
        workbook
    }

    #[test]
    fn test_find_heading_respects_lower_bound() {
        let workbook = sheet_with_headings(&[
            (3, "01. Compound Unlimited (CU)"),
            (5, "02. Compound Limited (CL)"),
            (9, "01. Compound Unlimited (CU)"),
        ]);
        let sheet = workbook.worksheet("Results").unwrap();
        let first = Ordinal::parse("01").unwrap();

        assert_eq!(find_heading(sheet, 0, first, 1), Some(3));
        assert_eq!(find_heading(sheet, 0, first, 4), Some(9));
        assert_eq!(find_heading(sheet, 0, first, 10), None);
        assert_eq!(find_heading(sheet, 0, Ordinal::parse("07").unwrap(), 1), None);
    }

    #[test]
    fn test_list_headings() {
        let workbook = sheet_with_headings(&[
            (3, "01. Compound Unlimited (CU)"),
            (4, "Not a heading"),
            (5, "02. Compound Limited (CL)"),
        ]);
        let sheet = workbook.worksheet("Results").unwrap();
        let rows: Vec<u32> = list_headings(sheet, 0).iter().map(|h| h.row).collect();
        assert_eq!(rows, vec![3, 5]);
    }
}
