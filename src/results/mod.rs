//! Retrieval of tournament results ahead of an export

pub mod reader;
pub mod tables;

pub use reader::CsvResultsSource;

use crate::error::Result;
use crate::model::TournamentResultsData;

/// Looks up a published tournament and its checked-in participants
pub trait ResultsSource {
    fn tournament_results(&self, tournament_id: &str) -> Result<TournamentResultsData>;
}
