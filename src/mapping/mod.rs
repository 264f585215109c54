//! Federation classification tables
//!
//! The tables come from persisted configuration through a [`MappingProvider`]
//! handed in by the caller, and are validated once into an immutable
//! [`ClassificationTables`] that can be shared between exports.

pub mod reader;
pub mod tables;

pub use reader::CsvMappingProvider;

use crate::error::{ExportError, Result};
use crate::model::{AgeGenderKey, AgeGenderMapping, BowStyle, BowStyleMapping, Ordinal};
use std::collections::HashMap;

/// Source of the two classification tables
pub trait MappingProvider {
    /// Equipment category to bow style rows
    fn bow_styles(&self) -> Result<Vec<BowStyleMapping>>;

    /// (age group, gender) to federation category rows
    fn age_gender_categories(&self) -> Result<Vec<AgeGenderMapping>>;
}

/// Mapping rows held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticMappingProvider {
    pub bow_styles: Vec<BowStyleMapping>,
    pub age_genders: Vec<AgeGenderMapping>,
}

impl StaticMappingProvider {
    pub fn new(bow_styles: Vec<BowStyleMapping>, age_genders: Vec<AgeGenderMapping>) -> Self {
        Self {
            bow_styles,
            age_genders,
        }
    }
}

impl MappingProvider for StaticMappingProvider {
    fn bow_styles(&self) -> Result<Vec<BowStyleMapping>> {
        Ok(self.bow_styles.clone())
    }

    fn age_gender_categories(&self) -> Result<Vec<AgeGenderMapping>> {
        Ok(self.age_genders.clone())
    }
}

/// Validated lookup tables
#[derive(Debug, Clone)]
pub struct ClassificationTables {
    /// Distinct bow styles in ascending ordinal order
    bow_styles: Vec<BowStyle>,
    equipment: HashMap<String, Ordinal>,
    age_genders: HashMap<AgeGenderKey, AgeGenderMapping>,
}

impl ClassificationTables {
    pub fn load(provider: &dyn MappingProvider) -> Result<Self> {
        Self::new(provider.bow_styles()?, provider.age_gender_categories()?)
    }

    pub fn new(bow_style_rows: Vec<BowStyleMapping>, age_gender_rows: Vec<AgeGenderMapping>) -> Result<Self> {
        let mut bow_styles: Vec<BowStyle> = Vec::new();
        let mut equipment = HashMap::new();

        for row in bow_style_rows {
            let style = row.bow_style();
            match bow_styles.iter().find(|s| s.ordinal == style.ordinal) {
                Some(existing) if *existing != style => {
                    return Err(ExportError::InvalidMapping(format!(
                        "ordinal {} is used by both {} and {}",
                        style.ordinal,
                        existing.heading_text(),
                        style.heading_text()
                    )));
                }
                Some(_) => {}
                None => bow_styles.push(style),
            }

            if equipment
                .insert(row.equipment_category_id.clone(), row.ordinal)
                .is_some()
            {
                return Err(ExportError::InvalidMapping(format!(
                    "equipment category {} is mapped more than once",
                    row.equipment_category_id
                )));
            }
        }
        bow_styles.sort_by_key(|s| s.ordinal);

        let mut age_genders = HashMap::new();
        for row in age_gender_rows {
            let key = row.key.clone();
            if age_genders.insert(key.clone(), row).is_some() {
                return Err(ExportError::InvalidMapping(format!(
                    "age group {} / {} is mapped more than once",
                    key.age_group_id, key.gender
                )));
            }
        }

        Ok(Self {
            bow_styles,
            equipment,
            age_genders,
        })
    }

    /// Distinct bow styles in ascending ordinal order
    pub fn bow_styles(&self) -> &[BowStyle] {
        &self.bow_styles
    }

    pub fn bow_style(&self, ordinal: Ordinal) -> Option<&BowStyle> {
        self.bow_styles.iter().find(|s| s.ordinal == ordinal)
    }

    pub fn bow_style_for(&self, equipment_category_id: &str) -> Option<&BowStyle> {
        self.equipment
            .get(equipment_category_id)
            .and_then(|ordinal| self.bow_style(*ordinal))
    }

    pub fn age_gender_for(&self, key: &AgeGenderKey) -> Option<&AgeGenderMapping> {
        self.age_genders.get(key)
    }
}
