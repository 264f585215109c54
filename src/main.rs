use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ifaf_results::export::heading;
use ifaf_results::export::group_participants;
use ifaf_results::{
    template, ClassificationTables, CsvMappingProvider, CsvResultsSource, IfafExporter, ResultsSource,
    TemplateLayout,
};

#[derive(Parser)]
#[command(name = "ifaf-export")]
#[command(about = "Export archery tournament results into IFAF results templates", long_about = None)]
struct Cli {
    /// Name of the worksheet holding the results
    #[arg(long, global = true, env = "IFAF_SHEET_NAME", default_value = "Results")]
    sheet_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill the results template for one tournament
    Export {
        /// Directory holding the mapping and results CSV files
        #[arg(long, env = "IFAF_DATA_DIR")]
        data_dir: PathBuf,

        /// Tournament id
        #[arg(long)]
        tournament: String,

        /// Results template (.xlsx)
        #[arg(long, env = "IFAF_TEMPLATE")]
        template: PathBuf,

        /// Output file; defaults to a name derived from the tournament
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a blank results template with one heading per bow style
    Template {
        /// Directory holding the mapping CSV files
        #[arg(long, env = "IFAF_DATA_DIR")]
        data_dir: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the bow-style headings found in a template
    Headings {
        /// Results template (.xlsx)
        #[arg(long, env = "IFAF_TEMPLATE")]
        template: PathBuf,
    },

    /// Print the ranked standings without writing a spreadsheet
    Standings {
        /// Directory holding the mapping and results CSV files
        #[arg(long, env = "IFAF_DATA_DIR")]
        data_dir: PathBuf,

        /// Tournament id
        #[arg(long)]
        tournament: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let layout = TemplateLayout::default().with_sheet_name(cli.sheet_name);

    match cli.command {
        Commands::Export {
            data_dir,
            tournament,
            template,
            output,
        } => {
            export(&data_dir, &tournament, &template, output, layout)?;
        }
        Commands::Template { data_dir, output } => {
            write_template(&data_dir, &output, &layout)?;
        }
        Commands::Headings { template } => {
            headings(&template, &layout)?;
        }
        Commands::Standings { data_dir, tournament } => {
            standings(&data_dir, &tournament)?;
        }
    }

    Ok(())
}

fn load_tables(data_dir: &Path) -> Result<ClassificationTables> {
    let provider = CsvMappingProvider::from_dir(data_dir);
    ClassificationTables::load(&provider).context("Failed to load classification tables")
}

fn export(
    data_dir: &Path,
    tournament_id: &str,
    template_path: &Path,
    output: Option<PathBuf>,
    layout: TemplateLayout,
) -> Result<()> {
    let tables = Arc::new(load_tables(data_dir)?);
    println!("Loaded {} bow styles", tables.bow_styles().len());

    let data = CsvResultsSource::from_dir(data_dir)
        .tournament_results(tournament_id)
        .with_context(|| format!("Failed to load results for tournament {}", tournament_id))?;
    println!(
        "Tournament: {} ({} participants)",
        data.tournament.name,
        data.participant_count()
    );

    let exporter = IfafExporter::from_template_file(template_path, tables)
        .context("Failed to read template")?
        .with_layout(layout);
    let file = exporter.export_file(&data).context("Failed to export results")?;

    let output = output.unwrap_or_else(|| PathBuf::from(&file.filename));
    println!("Writing Excel file: {}", output.display());
    std::fs::write(&output, &file.bytes).context("Failed to write Excel file")?;

    println!("Done!");
    Ok(())
}

fn write_template(data_dir: &Path, output: &Path, layout: &TemplateLayout) -> Result<()> {
    let tables = load_tables(data_dir)?;
    println!("Writing template with {} headings: {}", tables.bow_styles().len(), output.display());
    template::write_template(&tables, layout, output).context("Failed to write template")?;

    println!("Done!");
    Ok(())
}

fn headings(template_path: &Path, layout: &TemplateLayout) -> Result<()> {
    let workbook = ifaf_results::xlsx::Workbook::open(template_path).context("Failed to read template")?;
    let sheet = workbook
        .worksheet(&layout.sheet_name)
        .with_context(|| format!("Template has no '{}' sheet", layout.sheet_name))?;

    let found = heading::list_headings(sheet, layout.category_column);
    println!("Template: {}", template_path.display());
    println!("Headings: {}", found.len());
    for h in &found {
        println!("  row {:>4}  {}", h.row, h.text);
    }

    Ok(())
}

fn standings(data_dir: &Path, tournament_id: &str) -> Result<()> {
    let tables = load_tables(data_dir)?;
    let data = CsvResultsSource::from_dir(data_dir)
        .tournament_results(tournament_id)
        .with_context(|| format!("Failed to load results for tournament {}", tournament_id))?;

    println!("{} - {} ({})", data.tournament.name, data.tournament.iso_date(), data.tournament.round_format);
    println!();

    let grouping = group_participants(&data.participants, &tables);
    for group in &grouping.bow_styles {
        println!("{}", group.bow_style.heading_text());
        for category in &group.categories {
            println!("  {}", category.category.display_label());
            for (place, participant) in category.ranked() {
                println!(
                    "    {:>3}. {:<30} {:<24} {:>5}",
                    place,
                    participant.name,
                    participant.club_display(),
                    participant.score_or_zero()
                );
            }
        }
        println!();
    }

    if !grouping.unmapped.is_empty() {
        println!("Not classified: {}", grouping.unmapped.len());
        for participant in &grouping.unmapped {
            println!(
                "  {} ({} / {} {})",
                participant.name, participant.equipment_category_id, participant.age_group_id, participant.gender
            );
        }
    }

    Ok(())
}
