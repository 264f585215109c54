use super::tables::{AgeGenderRow, BowStyleRow};
use super::MappingProvider;
use crate::error::{ExportError, Result};
use crate::model::{AgeGenderKey, AgeGenderMapping, BowStyleMapping, Gender, Ordinal};
use std::path::{Path, PathBuf};

pub const BOW_STYLES_FILE: &str = "bow_styles.csv";
pub const AGE_GENDER_FILE: &str = "age_gender.csv";

/// Reads the classification tables from two CSV files
#[derive(Debug, Clone)]
pub struct CsvMappingProvider {
    bow_styles_path: PathBuf,
    age_gender_path: PathBuf,
}

impl CsvMappingProvider {
    pub fn new(bow_styles_path: impl Into<PathBuf>, age_gender_path: impl Into<PathBuf>) -> Self {
        Self {
            bow_styles_path: bow_styles_path.into(),
            age_gender_path: age_gender_path.into(),
        }
    }

    /// Use `bow_styles.csv` and `age_gender.csv` inside `dir`
    pub fn from_dir(dir: &Path) -> Self {
        Self::new(dir.join(BOW_STYLES_FILE), dir.join(AGE_GENDER_FILE))
    }
}

impl MappingProvider for CsvMappingProvider {
    fn bow_styles(&self) -> Result<Vec<BowStyleMapping>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.bow_styles_path)?;

        let mut mappings = Vec::new();
        for result in reader.deserialize() {
            let row: BowStyleRow = result?;
            mappings.push(BowStyleMapping {
                equipment_category_id: row.equipment_category_id,
                bow_style_code: row.bow_style_code,
                bow_style_name: row.bow_style_name,
                ordinal: Ordinal::parse(&row.ordinal)?,
            });
        }

        mappings.sort_by_key(|m| m.ordinal);
        Ok(mappings)
    }

    fn age_gender_categories(&self) -> Result<Vec<AgeGenderMapping>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.age_gender_path)?;

        let mut mappings = Vec::new();
        for result in reader.deserialize() {
            let row: AgeGenderRow = result?;
            let gender = Gender::from_code(&row.gender).ok_or_else(|| ExportError::InvalidGender(row.gender.clone()))?;
            mappings.push(AgeGenderMapping {
                key: AgeGenderKey::new(row.age_group_id, gender),
                category_code: row.category_code,
                category_name: row.category_name,
            });
        }
        Ok(mappings)
    }
}
