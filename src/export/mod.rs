//! Filling the federation results template with a tournament's results
//!
//! The exporter owns a copy of the template bytes and the validated
//! classification tables. Every export opens a fresh workbook from those bytes,
//! so one exporter can serve any number of exports, including concurrent ones.

pub mod grouping;
pub mod header;
pub mod heading;
pub mod layout;
pub mod rows;

pub use grouping::{group_participants, BowStyleGroup, CategoryGroup, Grouping};
pub use layout::TemplateLayout;

use crate::error::Result;
use crate::mapping::ClassificationTables;
use crate::model::{Ordinal, TournamentResultsData};
use crate::xlsx::Workbook;
use rows::BlockWriter;
use std::path::Path;
use std::sync::Arc;

/// MIME type of the exported workbook
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A finished export, ready to hand to a download
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// What an export did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub rows_written: usize,
    pub bow_styles_exported: usize,
    /// Bow styles whose heading was not found in the template
    pub missing_headings: Vec<Ordinal>,
    /// Participants skipped for lack of a mapping or a heading
    pub participants_skipped: usize,
}

/// Exports tournament results into copies of one template
#[derive(Debug, Clone)]
pub struct IfafExporter {
    template: Arc<[u8]>,
    tables: Arc<ClassificationTables>,
    layout: TemplateLayout,
}

impl IfafExporter {
    pub fn new(template: impl Into<Arc<[u8]>>, tables: Arc<ClassificationTables>) -> Self {
        Self {
            template: template.into(),
            tables,
            layout: TemplateLayout::default(),
        }
    }

    /// Read the template from disk
    pub fn from_template_file(path: &Path, tables: Arc<ClassificationTables>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, tables))
    }

    pub fn with_layout(mut self, layout: TemplateLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    /// Fill a fresh copy of the template and return the workbook bytes
    pub fn export(&self, data: &TournamentResultsData) -> Result<Vec<u8>> {
        self.export_with_summary(data).map(|(bytes, _)| bytes)
    }

    /// Like [`export`](Self::export), with a summary of what was written
    pub fn export_with_summary(&self, data: &TournamentResultsData) -> Result<(Vec<u8>, ExportSummary)> {
        let mut workbook = Workbook::from_bytes(&self.template)?;
        let sheet = workbook.worksheet_mut(&self.layout.sheet_name)?;

        header::fill_header(sheet, &self.layout, data)?;

        let grouping = group_participants(&data.participants, &self.tables);
        let mut summary = ExportSummary {
            participants_skipped: grouping.unmapped.len(),
            ..ExportSummary::default()
        };

        // Headings are matched in ordinal order, each search starting below the last block
        let mut cursor = 1;
        for style in self.tables.bow_styles() {
            let group = grouping.group(style.ordinal);
            let Some(heading_row) = heading::find_heading(sheet, self.layout.category_column, style.ordinal, cursor)
            else {
                let skipped = group.map_or(0, BowStyleGroup::participant_count);
                log::info!(
                    "Template has no heading for {}; skipping {} participant(s)",
                    style.heading_text(),
                    skipped
                );
                summary.missing_headings.push(style.ordinal);
                summary.participants_skipped += skipped;
                continue;
            };

            log::debug!("Found {} at row {}", style.heading_text(), heading_row);

            let Some(group) = group else {
                log::debug!("No participants for {}", style.heading_text());
                cursor = heading_row + 1;
                continue;
            };

            let mut writer = BlockWriter::new(sheet, &self.layout, heading_row);
            summary.rows_written += writer.write_group(group);
            summary.bow_styles_exported += 1;
            cursor = writer.cursor();
        }

        log::info!(
            "Exported {} rows across {} bow styles for {} ({} skipped, {} headings missing)",
            summary.rows_written,
            summary.bow_styles_exported,
            data.tournament.name,
            summary.participants_skipped,
            summary.missing_headings.len()
        );

        Ok((workbook.to_bytes()?, summary))
    }

    /// Export and package the result with its download name and MIME type
    pub fn export_file(&self, data: &TournamentResultsData) -> Result<ExportedFile> {
        Ok(ExportedFile {
            filename: download_filename(&data.tournament.name),
            content_type: XLSX_CONTENT_TYPE,
            bytes: self.export(data)?,
        })
    }
}

/// `"Spring Field Round 2024"` becomes `"Spring_Field_Round_2024.xlsx"`
pub fn download_filename(tournament_name: &str) -> String {
    lazy_static::lazy_static! {
        static ref UNSAFE_RUN: regex::Regex = regex::Regex::new(r"[^A-Za-z0-9]+").unwrap();
    }

    let stem = UNSAFE_RUN.replace_all(tournament_name.trim(), "_");
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "results.xlsx".to_string()
    } else {
        format!("{stem}.xlsx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::export::heading::{list_headings, parse_heading};
    use crate::mapping::tests::{bow_style, federation_age_genders, federation_bow_styles, federation_tables};
    use crate::model::{Gender, ParticipantResult, Tournament};
    use crate::template::build_template;
    use crate::xlsx::Worksheet;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn tournament(name: &str) -> Tournament {
        Tournament {
            id: "t1".to_string(),
            name: name.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 13).unwrap(),
            organizer_club: "Forest Archers".to_string(),
            round_format: "IFAA Field".to_string(),
        }
    }

    /// Five archers over three equipment categories and three age/gender pairs
    fn five_archers() -> TournamentResultsData {
        let participants = vec![
            ParticipantResult::new("p1", "Alice Smith", "CU", "ADULT", Gender::Female)
                .with_score(290)
                .with_club("Forest Archers")
                .with_membership_number("1001"),
            ParticipantResult::new("p2", "Bob Johnson", "BBR", "ADULT", Gender::Male).with_score(285),
            ParticipantResult::new("p3", "Carol White", "CU", "ADULT", Gender::Female)
                .with_score(280)
                .with_club("Hill Bowmen")
                .with_membership_number("1003"),
            ParticipantResult::new("p4", "David Brown", "LB", "VETERAN", Gender::Male)
                .with_score(275)
                .with_club("Hill Bowmen"),
            ParticipantResult::new("p5", "Eve Davis", "BBR", "ADULT", Gender::Male)
                .with_score(270)
                .with_club("Forest Archers"),
        ];
        TournamentResultsData::new(tournament("Spring Field Round 2024"), participants)
    }

    fn exporter() -> IfafExporter {
        let tables = Arc::new(federation_tables());
        let template = build_template(&tables, &TemplateLayout::default()).unwrap();
        IfafExporter::new(template, tables)
    }

    fn participant_rows(sheet: &Worksheet) -> Vec<u32> {
        let first_heading = list_headings(sheet, 0).first().map_or(u32::MAX, |h| h.row);
        (first_heading..=sheet.last_row())
            .filter(|&row| sheet.cell_text(row, 1).is_some_and(|t| !t.is_empty()))
            .collect()
    }

    #[test]
    fn test_export_reference_tournament() {
        let bytes = exporter().export(&five_archers()).unwrap();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();

        assert_eq!(list_headings(sheet, 0).len(), 12);
        assert_eq!(participant_rows(sheet).len(), 5);

        // 01 CU: two Adult Female archers, then a separator
        assert_eq!(sheet.cell_text(7, 0).as_deref(), Some("01. Compound Unlimited (CU)"));
        assert_eq!(sheet.cell_text(9, 0).as_deref(), Some("2 Adult Female"));
        assert_eq!(sheet.cell_text(9, 1).as_deref(), Some("Alice Smith"));
        assert_eq!(sheet.cell_text(9, 2).as_deref(), Some("1001"));
        assert_eq!(sheet.cell_text(9, 4).as_deref(), Some("290"));
        assert_eq!(sheet.cell_text(10, 1).as_deref(), Some("Carol White"));
        assert!(sheet.row_is_blank(11));

        // 02 CL has no archers and keeps its single blank row
        assert_eq!(sheet.cell_text(12, 0).as_deref(), Some("02. Compound Limited (CL)"));
        assert!(sheet.row_is_blank(13));
        assert_eq!(sheet.cell_text(14, 0).as_deref(), Some("03. Barebow Compound (BBC)"));

        // 04 BBR
        assert_eq!(sheet.cell_text(16, 0).as_deref(), Some("04. Barebow Recurve (BBR)"));
        assert_eq!(sheet.cell_text(18, 0).as_deref(), Some("1 Adult Male"));
        assert_eq!(sheet.cell_text(18, 1).as_deref(), Some("Bob Johnson"));
        assert_eq!(sheet.cell_text(18, 2).as_deref(), Some(""));
        assert_eq!(sheet.cell_text(18, 3).as_deref(), Some("Independent"));
        assert_eq!(sheet.cell_text(19, 1).as_deref(), Some("Eve Davis"));
        assert!(sheet.row_is_blank(20));

        // 10 LB
        assert_eq!(sheet.cell_text(31, 0).as_deref(), Some("10. Longbow (LB)"));
        assert_eq!(sheet.cell_text(33, 0).as_deref(), Some("3 Veteran Male"));
        assert_eq!(sheet.cell_text(33, 1).as_deref(), Some("David Brown"));
        assert!(sheet.row_is_blank(34));
        assert_eq!(sheet.cell_text(35, 0).as_deref(), Some("11. Traditional Recurve (TR)"));
    }

    #[test]
    fn test_headings_stay_in_order() {
        let bytes = exporter().export(&five_archers()).unwrap();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();

        let ordinals: Vec<u8> = list_headings(sheet, 0).iter().map(|h| h.ordinal.value()).collect();
        assert_eq!(ordinals, (1..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn test_inserted_rows_copy_pattern_formatting() {
        let exporter = exporter();
        let template = Workbook::from_bytes(&exporter.template).unwrap();
        let pattern_style = template.worksheet("Results").unwrap().cell_style(8, 1);
        assert!(pattern_style.is_some());

        let bytes = exporter.export(&five_archers()).unwrap();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();
        for row in [8, 9, 10, 11, 18, 19, 20, 33, 34] {
            assert_eq!(sheet.cell_style(row, 1), pattern_style, "row {row}");
        }
        // Headings keep their own formatting
        assert_ne!(sheet.cell_style(16, 0), pattern_style);
    }

    #[test]
    fn test_header_cells() {
        let bytes = exporter().export(&five_archers()).unwrap();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();

        assert_eq!(sheet.cell_text_at("B2").unwrap().as_deref(), Some("Forest Archers"));
        assert_eq!(sheet.cell_text_at("B3").unwrap().as_deref(), Some("IFAA Field"));
        assert_eq!(sheet.cell_text_at("B4").unwrap().as_deref(), Some("5"));
        assert_eq!(sheet.cell_text_at("B5").unwrap().as_deref(), Some("2024-04-13"));
    }

    #[test]
    fn test_output_reads_back_with_calamine() {
        let bytes = exporter().export(&five_archers()).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Results").unwrap();

        // calamine positions are 0-based
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("Forest Archers".to_string())));
        assert_eq!(range.get_value((3, 1)), Some(&Data::Float(5.0)));
        assert_eq!(
            range.get_value((6, 0)),
            Some(&Data::String("01. Compound Unlimited (CU)".to_string()))
        );
        assert_eq!(range.get_value((17, 1)), Some(&Data::String("Bob Johnson".to_string())));
        assert_eq!(range.get_value((17, 3)), Some(&Data::String("Independent".to_string())));
        assert_eq!(range.get_value((17, 4)), Some(&Data::Float(285.0)));
    }

    #[test]
    fn test_no_participants_leaves_blocks_empty() {
        let data = TournamentResultsData::new(tournament("Empty"), Vec::new());
        let (bytes, summary) = exporter().export_with_summary(&data).unwrap();
        assert_eq!(summary.rows_written, 0);
        assert_eq!(summary.bow_styles_exported, 0);
        assert!(summary.missing_headings.is_empty());

        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();
        assert_eq!(sheet.last_row(), 30);
        assert_eq!(sheet.cell_text_at("B4").unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_missing_heading_is_skipped() {
        // Template knows twelve bow styles; the tables add a thirteenth
        let template_tables = federation_tables();
        let template = build_template(&template_tables, &TemplateLayout::default()).unwrap();

        let mut rows = federation_bow_styles();
        rows.push(bow_style("XB", "XB", "Crossbow", "13"));
        let tables = Arc::new(ClassificationTables::new(rows, federation_age_genders()).unwrap());
        let exporter = IfafExporter::new(template, tables);

        let mut data = five_archers();
        data.participants
            .push(ParticipantResult::new("p6", "Xavier", "XB", "ADULT", Gender::Male).with_score(300));

        let (bytes, summary) = exporter.export_with_summary(&data).unwrap();
        assert_eq!(summary.rows_written, 5);
        assert_eq!(summary.bow_styles_exported, 3);
        assert_eq!(summary.missing_headings, vec![Ordinal::parse("13").unwrap()]);
        assert_eq!(summary.participants_skipped, 1);

        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();
        assert_eq!(participant_rows(sheet).len(), 5);
    }

    #[test]
    fn test_unmapped_participants_are_counted() {
        let mut data = five_archers();
        data.participants
            .push(ParticipantResult::new("p6", "Mystery", "CROSSBOW", "ADULT", Gender::Male).with_score(300));
        data.participants
            .push(ParticipantResult::new("p7", "Master", "CU", "MASTER", Gender::Male).with_score(300));

        let (bytes, summary) = exporter().export_with_summary(&data).unwrap();
        assert_eq!(summary.rows_written, 5);
        assert_eq!(summary.participants_skipped, 2);

        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();
        // The header counts every checked-in participant
        assert_eq!(sheet.cell_text_at("B4").unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn test_repeated_exports_are_independent() {
        let exporter = exporter();
        let first = exporter.export(&five_archers()).unwrap();
        let second = exporter.export(&five_archers()).unwrap();

        for bytes in [&first, &second] {
            let workbook = Workbook::from_bytes(bytes).unwrap();
            let sheet = workbook.worksheet("Results").unwrap();
            assert_eq!(participant_rows(sheet).len(), 5);
            assert_eq!(list_headings(sheet, 0).len(), 12);
        }
    }

    #[test]
    fn test_concurrent_exports() {
        use rayon::prelude::*;

        let exporter = exporter();
        let results: Vec<Result<Vec<u8>>> = (0..8)
            .into_par_iter()
            .map(|i| {
                let mut data = five_archers();
                data.participants.truncate(1 + i % 5);
                exporter.export(&data)
            })
            .collect();

        for (i, result) in results.into_iter().enumerate() {
            let bytes = result.unwrap();
            let workbook = Workbook::from_bytes(&bytes).unwrap();
            let sheet = workbook.worksheet("Results").unwrap();
            assert_eq!(participant_rows(sheet).len(), 1 + i % 5);
        }
    }

    #[test]
    fn test_missing_worksheet() {
        let exporter = exporter().with_layout(TemplateLayout::default().with_sheet_name("Scores"));
        assert!(matches!(
            exporter.export(&five_archers()),
            Err(ExportError::MissingWorksheet(name)) if name == "Scores"
        ));
    }

    #[test]
    fn test_invalid_template_bytes() {
        let exporter = IfafExporter::new(b"not a workbook".to_vec(), Arc::new(federation_tables()));
        assert!(exporter.export(&five_archers()).is_err());
    }

    #[test]
    fn test_export_file() {
        let file = exporter().export_file(&five_archers()).unwrap();
        assert_eq!(file.filename, "Spring_Field_Round_2024.xlsx");
        assert_eq!(file.content_type, XLSX_CONTENT_TYPE);
        assert_eq!(&file.bytes[..2], b"PK");
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(download_filename("Club Shoot: Autumn/Winter"), "Club_Shoot_Autumn_Winter.xlsx");
        assert_eq!(download_filename("  !!  "), "results.xlsx");
        assert_eq!(download_filename(""), "results.xlsx");
    }

    #[test]
    fn test_written_category_labels_are_not_headings() {
        let bytes = exporter().export(&five_archers()).unwrap();
        let workbook = Workbook::from_bytes(&bytes).unwrap();
        let sheet = workbook.worksheet("Results").unwrap();
        for row in participant_rows(sheet) {
            let label = sheet.cell_text(row, 0).unwrap_or_default();
            assert_eq!(parse_heading(&label), None, "row {row}");
        }
    }
}
