pub mod cell_ref;
pub mod workbook;

pub use cell_ref::{column_index, column_name, CellRange, CellRef};
pub use workbook::{Cell, CellValue, RowStyle, Workbook, Worksheet};
