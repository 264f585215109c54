use std::fmt;

/// Club name shown for archers who shoot without a club
pub const INDEPENDENT_CLUB: &str = "Independent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "M" | "MALE" => Some(Gender::Male),
            "F" | "FEMALE" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_code())
    }
}

/// One checked-in archer and their score in a tournament
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantResult {
    pub id: String,
    pub name: String,
    pub membership_number: Option<String>,
    /// `None` means the archer shoots as an independent
    pub club: Option<String>,
    pub equipment_category_id: String,
    pub age_group_id: String,
    pub gender: Gender,
    /// `None` until the archer has been scored
    pub score: Option<i32>,
}

impl ParticipantResult {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        equipment_category_id: impl Into<String>,
        age_group_id: impl Into<String>,
        gender: Gender,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            membership_number: None,
            club: None,
            equipment_category_id: equipment_category_id.into(),
            age_group_id: age_group_id.into(),
            gender,
            score: None,
        }
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_club(mut self, club: impl Into<String>) -> Self {
        self.club = Some(club.into());
        self
    }

    pub fn with_membership_number(mut self, number: impl Into<String>) -> Self {
        self.membership_number = Some(number.into());
        self
    }

    /// Score used for ranking; unscored archers rank as zero
    pub fn score_or_zero(&self) -> i32 {
        self.score.unwrap_or(0)
    }

    /// Club name as printed on result sheets, never blank
    pub fn club_display(&self) -> &str {
        match self.club.as_deref().map(str::trim) {
            Some(club) if !club.is_empty() => club,
            _ => INDEPENDENT_CLUB,
        }
    }

    pub fn membership_display(&self) -> &str {
        self.membership_number.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parsing() {
        assert_eq!(Gender::from_code("M"), Some(Gender::Male));
        assert_eq!(Gender::from_code("f"), Some(Gender::Female));
        assert_eq!(Gender::from_code(" Female "), Some(Gender::Female));
        assert_eq!(Gender::from_code("X"), None);
        assert_eq!(Gender::Male.to_string(), "M");
    }

    #[test]
    fn test_club_display() {
        let archer = ParticipantResult::new("p1", "Bob Johnson", "BBR", "ADULT", Gender::Male);
        assert_eq!(archer.club_display(), "Independent");

        let blank = archer.clone().with_club("   ");
        assert_eq!(blank.club_display(), "Independent");

        let member = archer.with_club("Forest Archers");
        assert_eq!(member.club_display(), "Forest Archers");
    }

    #[test]
    fn test_score_defaults() {
        let archer = ParticipantResult::new("p1", "Ann", "RC", "ADULT", Gender::Female);
        assert_eq!(archer.score_or_zero(), 0);
        assert_eq!(archer.membership_display(), "");
        assert_eq!(archer.with_score(287).score_or_zero(), 287);
    }
}
