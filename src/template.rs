//! Scaffold results template, for clubs that do not have the federation's file

use crate::error::Result;
use crate::export::TemplateLayout;
use crate::mapping::ClassificationTables;
use crate::xlsx::CellRef;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};
use std::path::Path;

const TITLE: &str = "IFAF Tournament Results";

/// Build a template with a header block and one heading per bow style.
///
/// Each heading is followed by a blank row whose cells carry the formatting
/// that exported participant rows copy.
pub fn build_template(tables: &ClassificationTables, layout: &TemplateLayout) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_template_sheet(worksheet, tables, layout)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write a template to `path`
pub fn write_template(tables: &ClassificationTables, layout: &TemplateLayout, path: &Path) -> Result<()> {
    std::fs::write(path, build_template(tables, layout)?)?;
    Ok(())
}

fn write_template_sheet(sheet: &mut Worksheet, tables: &ClassificationTables, layout: &TemplateLayout) -> Result<()> {
    sheet.set_name(&layout.sheet_name)?;

    sheet.set_column_width(layout.category_column, 22)?;
    sheet.set_column_width(layout.name_column, 28)?;
    sheet.set_column_width(layout.membership_column, 14)?;
    sheet.set_column_width(layout.club_column, 26)?;
    sheet.set_column_width(layout.score_column, 8)?;

    let title_format = Format::new().set_bold().set_font_size(14);
    let label_format = Format::new().set_bold();
    let heading_format = Format::new().set_bold().set_border_bottom(FormatBorder::Medium);
    let row_format = Format::new().set_border_bottom(FormatBorder::Thin);

    sheet.write_string_with_format(0, 0, TITLE, &title_format)?;

    // Header labels sit to the left of their value cells
    let mut last_header_row = 1;
    for (label, address) in layout.header_fields() {
        let cell = CellRef::parse(address)?;
        if cell.col > 0 {
            sheet.write_string_with_format(cell.row - 1, cell.col - 1, label, &label_format)?;
        }
        sheet.write_blank(cell.row - 1, cell.col, &row_format)?;
        last_header_row = last_header_row.max(cell.row);
    }

    // Zero-based; one spare row between the header block and the first heading
    let mut row = last_header_row + 1;
    for style in tables.bow_styles() {
        sheet.write_string_with_format(row, layout.category_column, &style.heading_text(), &heading_format)?;
        for col in layout.data_columns() {
            sheet.write_blank(row + layout.pattern_row_offset, col, &row_format)?;
        }
        row += layout.pattern_row_offset + 1;
    }

    Ok(())
}
