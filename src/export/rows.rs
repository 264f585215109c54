//! Writing ranked participants beneath a bow-style heading

use super::grouping::BowStyleGroup;
use super::TemplateLayout;
use crate::model::ParticipantResult;
use crate::xlsx::{RowStyle, Worksheet};

/// Writes one bow-style block, inserting rows so nothing below is overwritten.
///
/// New rows copy the formatting of the row right after the heading. Rows are
/// inserted at `heading + 2`, leaving the heading's own blank row in place.
pub struct BlockWriter<'a> {
    sheet: &'a mut Worksheet,
    layout: &'a TemplateLayout,
    pattern: RowStyle,
    cursor: u32,
}

impl<'a> BlockWriter<'a> {
    pub fn new(sheet: &'a mut Worksheet, layout: &'a TemplateLayout, heading_row: u32) -> Self {
        let pattern = sheet.row_style(heading_row + layout.pattern_row_offset);
        Self {
            sheet,
            layout,
            pattern,
            cursor: heading_row + 2,
        }
    }

    /// Row the next write lands on
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Write every category of `group`, each followed by a blank separator row.
    ///
    /// Returns the number of participant rows written.
    pub fn write_group(&mut self, group: &BowStyleGroup<'_>) -> usize {
        let needed = group.row_count();
        if needed == 0 {
            return 0;
        }

        log::debug!(
            "Inserting {} rows at row {} for {}",
            needed,
            self.cursor,
            group.bow_style.code
        );
        self.sheet.insert_rows(self.cursor, needed);
        for row in self.cursor..self.cursor + needed {
            self.sheet.apply_row_style(row, &self.pattern);
        }

        let mut written = 0;
        for category in &group.categories {
            let label = category.category.display_label();
            for (_, participant) in category.ranked() {
                self.write_participant(&label, participant);
                written += 1;
            }
            // Separator: already blank and styled
            self.cursor += 1;
        }
        written
    }

    fn write_participant(&mut self, label: &str, participant: &ParticipantResult) {
        let row = self.cursor;
        let layout = self.layout;

        self.sheet.set_text(row, layout.category_column, label);
        self.sheet.set_text(row, layout.name_column, &participant.name);
        self.sheet
            .set_text(row, layout.membership_column, participant.membership_display());
        self.sheet.set_text(row, layout.club_column, participant.club_display());
        self.sheet
            .set_number(row, layout.score_column, f64::from(participant.score_or_zero()));
        self.cursor += 1;
    }
}
