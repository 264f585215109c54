use serde::Deserialize;

/// A row of `bow_styles.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct BowStyleRow {
    pub equipment_category_id: String,
    pub bow_style_code: String,
    pub bow_style_name: String,
    pub ordinal: String,
}

/// A row of `age_gender.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct AgeGenderRow {
    pub age_group_id: String,
    pub gender: String,
    pub category_code: String,
    pub category_name: String,
}
