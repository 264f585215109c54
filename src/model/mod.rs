pub mod classification;
pub mod participant;
pub mod tournament;

pub use classification::{AgeGenderKey, AgeGenderMapping, BowStyle, BowStyleMapping, Ordinal};
pub use participant::{Gender, ParticipantResult, INDEPENDENT_CLUB};
pub use tournament::{Tournament, TournamentResultsData};
