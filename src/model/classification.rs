use super::participant::Gender;
use crate::error::{ExportError, Result};
use std::fmt;

/// Two-digit federation bow-style number, e.g. `"02"`
///
/// Ordering is numeric, so `"02" < "10"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ordinal(u8);

impl Ordinal {
    pub fn new(value: u8) -> Result<Self> {
        if value > 99 {
            return Err(ExportError::InvalidOrdinal(value.to_string()));
        }
        Ok(Ordinal(value))
    }

    /// Parse `"2"`, `"02"` or `" 02 "`
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ExportError::InvalidOrdinal(s.to_string()));
        }
        trimmed
            .parse::<u8>()
            .map(Ordinal)
            .map_err(|_| ExportError::InvalidOrdinal(s.to_string()))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Maps one equipment category onto a federation bow style
#[derive(Debug, Clone, PartialEq)]
pub struct BowStyleMapping {
    pub equipment_category_id: String,
    pub bow_style_code: String,
    pub bow_style_name: String,
    pub ordinal: Ordinal,
}

impl BowStyleMapping {
    pub fn bow_style(&self) -> BowStyle {
        BowStyle {
            ordinal: self.ordinal,
            code: self.bow_style_code.clone(),
            name: self.bow_style_name.clone(),
        }
    }
}

/// A federation bow style; several equipment categories may share one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BowStyle {
    pub ordinal: Ordinal,
    pub code: String,
    pub name: String,
}

impl BowStyle {
    /// Heading text as it appears in the template, e.g. `"03. Barebow Recurve (BBR)"`
    pub fn heading_text(&self) -> String {
        format!("{}. {} ({})", self.ordinal, self.name, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgeGenderKey {
    pub age_group_id: String,
    pub gender: Gender,
}

impl AgeGenderKey {
    pub fn new(age_group_id: impl Into<String>, gender: Gender) -> Self {
        Self {
            age_group_id: age_group_id.into(),
            gender,
        }
    }
}

/// Maps an (age group, gender) pair onto a federation category
#[derive(Debug, Clone, PartialEq)]
pub struct AgeGenderMapping {
    pub key: AgeGenderKey,
    /// Numeric string; sorts categories within a bow-style block
    pub category_code: String,
    pub category_name: String,
}

impl AgeGenderMapping {
    /// Numeric sort key of the category code; non-numeric codes sort last
    pub fn sort_key(&self) -> u32 {
        self.category_code.trim().parse().unwrap_or(u32::MAX)
    }

    /// Category label written into the first column of each participant row
    pub fn display_label(&self) -> String {
        format!("{} {}", self.category_code, self.category_name)
    }
}
