/// Where things live in the results template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLayout {
    /// Worksheet holding the results
    pub sheet_name: String,
    pub host_club_cell: String,
    pub round_format_cell: String,
    pub participant_count_cell: String,
    pub date_cell: String,
    /// Column holding heading text and the category label
    pub category_column: u16,
    pub name_column: u16,
    pub membership_column: u16,
    pub club_column: u16,
    pub score_column: u16,
    /// Offset from a heading to the row whose formatting new rows copy
    pub pattern_row_offset: u32,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            sheet_name: "Results".to_string(),
            host_club_cell: "B2".to_string(),
            round_format_cell: "B3".to_string(),
            participant_count_cell: "B4".to_string(),
            date_cell: "B5".to_string(),
            category_column: 0,
            name_column: 1,
            membership_column: 2,
            club_column: 3,
            score_column: 4,
            pattern_row_offset: 1,
        }
    }
}

impl TemplateLayout {
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// `(label, cell)` for each header field, in display order
    pub fn header_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("Host club", self.host_club_cell.as_str()),
            ("Round", self.round_format_cell.as_str()),
            ("Participants", self.participant_count_cell.as_str()),
            ("Date", self.date_cell.as_str()),
        ]
    }

    /// Participant row columns, left to right
    pub fn data_columns(&self) -> [u16; 5] {
        [
            self.category_column,
            self.name_column,
            self.membership_column,
            self.club_column,
            self.score_column,
        ]
    }
}
