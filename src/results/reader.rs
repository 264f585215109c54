use super::tables::{ParticipantRow, TournamentRow};
use super::ResultsSource;
use crate::error::{ExportError, Result};
use crate::model::{Gender, ParticipantResult, Tournament, TournamentResultsData};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const TOURNAMENTS_FILE: &str = "tournaments.csv";
pub const PARTICIPANTS_FILE: &str = "participants.csv";

/// Reads tournaments and participants from CSV exports of the results database
#[derive(Debug, Clone)]
pub struct CsvResultsSource {
    tournaments_path: PathBuf,
    participants_path: PathBuf,
}

impl CsvResultsSource {
    pub fn new(tournaments_path: impl Into<PathBuf>, participants_path: impl Into<PathBuf>) -> Self {
        Self {
            tournaments_path: tournaments_path.into(),
            participants_path: participants_path.into(),
        }
    }

    /// Use `tournaments.csv` and `participants.csv` inside `dir`
    pub fn from_dir(dir: &Path) -> Self {
        Self::new(dir.join(TOURNAMENTS_FILE), dir.join(PARTICIPANTS_FILE))
    }

    fn find_tournament(&self, tournament_id: &str) -> Result<TournamentRow> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.tournaments_path)?;

        for result in reader.deserialize() {
            let row: TournamentRow = result?;
            if row.id == tournament_id {
                return Ok(row);
            }
        }
        Err(ExportError::TournamentNotFound(tournament_id.to_string()))
    }

    fn checked_in_participants(&self, tournament_id: &str) -> Result<Vec<ParticipantResult>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.participants_path)?;

        let mut participants = Vec::new();
        for result in reader.deserialize() {
            let row: ParticipantRow = result?;
            if row.tournament_id != tournament_id || !row.checked_in {
                continue;
            }
            participants.push(participant_from_row(row)?);
        }
        Ok(participants)
    }
}

impl ResultsSource for CsvResultsSource {
    fn tournament_results(&self, tournament_id: &str) -> Result<TournamentResultsData> {
        let row = self.find_tournament(tournament_id)?;
        if !row.published {
            return Err(ExportError::NotPublished(row.name));
        }

        let date = parse_date(&row.date)?;
        let participants = self.checked_in_participants(tournament_id)?;
        log::debug!(
            "Loaded {} checked-in participants for tournament {}",
            participants.len(),
            row.id
        );

        let tournament = Tournament {
            id: row.id,
            name: row.name,
            date,
            organizer_club: row.organizer_club,
            round_format: row.round_format,
        };
        Ok(TournamentResultsData::new(tournament, participants))
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| ExportError::InvalidDate(s.to_string()))
}

fn participant_from_row(row: ParticipantRow) -> Result<ParticipantResult> {
    let gender = Gender::from_code(&row.gender).ok_or_else(|| ExportError::InvalidGender(row.gender.clone()))?;
    let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

    Ok(ParticipantResult {
        id: row.id,
        name: row.name,
        membership_number: non_blank(row.membership_number),
        club: non_blank(row.club),
        equipment_category_id: row.equipment_category_id,
        age_group_id: row.age_group_id,
        gender,
        score: row.score,
    })
}
