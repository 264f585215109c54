use super::participant::ParticipantResult;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub organizer_club: String,
    pub round_format: String,
}

impl Tournament {
    /// Date in the `YYYY-MM-DD` form used on result sheets
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Read-only snapshot of a tournament and its checked-in participants
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentResultsData {
    pub tournament: Tournament,
    pub participants: Vec<ParticipantResult>,
}

impl TournamentResultsData {
    pub fn new(tournament: Tournament, participants: Vec<ParticipantResult>) -> Self {
        Self {
            tournament,
            participants,
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_date() {
        let tournament = Tournament {
            id: "t1".to_string(),
            name: "Spring Field Round".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            organizer_club: "Forest Archers".to_string(),
            round_format: "IFAA Field".to_string(),
        };
        assert_eq!(tournament.iso_date(), "2024-03-07");
    }
}
