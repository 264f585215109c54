pub mod error;
pub mod export;
pub mod mapping;
pub mod model;
pub mod results;
pub mod template;
pub mod xlsx;

pub use error::{ExportError, Result};
pub use export::{download_filename, ExportSummary, ExportedFile, IfafExporter, TemplateLayout, XLSX_CONTENT_TYPE};
pub use mapping::{ClassificationTables, CsvMappingProvider, MappingProvider, StaticMappingProvider};
pub use model::*;
pub use results::{CsvResultsSource, ResultsSource};
