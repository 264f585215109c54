use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Worksheet not found: {0}")]
    MissingWorksheet(String),

    #[error("Invalid workbook: {0}")]
    InvalidWorkbook(String),

    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Invalid ordinal: {0}")]
    InvalidOrdinal(String),

    #[error("Invalid gender: {0}")]
    InvalidGender(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(String),

    #[error("Tournament is not published: {0}")]
    NotPublished(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Excel error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, ExportError>;
