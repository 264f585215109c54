use super::TemplateLayout;
use crate::error::Result;
use crate::model::TournamentResultsData;
use crate::xlsx::Worksheet;

/// Fill the tournament header cells: host club, round, participant count and date
pub fn fill_header(sheet: &mut Worksheet, layout: &TemplateLayout, data: &TournamentResultsData) -> Result<()> {
    let tournament = &data.tournament;
    sheet.set_text_at(&layout.host_club_cell, &tournament.organizer_club)?;
    sheet.set_text_at(&layout.round_format_cell, &tournament.round_format)?;
    sheet.set_number_at(&layout.participant_count_cell, data.participant_count() as f64)?;
    sheet.set_text_at(&layout.date_cell, &tournament.iso_date())?;
    Ok(())
}
