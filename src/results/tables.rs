use serde::Deserialize;

/// A row of `tournaments.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct TournamentRow {
    pub id: String,
    pub name: String,
    pub date: String,
    pub organizer_club: String,
    pub round_format: String,
    pub published: bool,
}

/// A row of `participants.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantRow {
    pub tournament_id: String,
    pub id: String,
    pub name: String,
    pub membership_number: Option<String>,
    pub club: Option<String>,
    pub equipment_category_id: String,
    pub age_group_id: String,
    pub gender: String,
    pub score: Option<i32>,
    pub checked_in: bool,
}
