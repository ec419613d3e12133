// Entry point and high-level CLI flow.
//
// - Each `--data` source is loaded and normalized. The first builds the
//   roster and later ones are merged into it.
// - System reports are previewed as markdown and exported as CSV/JSON.
// - `--school` adds the comparative analysis for one school.
use std::path::{Path, PathBuf};

use anyhow::Context;
use bloom_scorecard::roster::{build_roster, Roster, SystemStats};
use bloom_scorecard::source::{open_source, TabularSource};
use bloom_scorecard::types::Pillar;
use bloom_scorecard::{analysis, merge, normalize, output, reports, util, ScorecardError};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "bloom-scorecard")]
#[command(about = "School performance scorecards and comparative analysis", long_about = None)]
struct Cli {
    /// CSV sheet directory or JSON workbook; repeat to merge later uploads
    #[arg(long = "data", required = true)]
    data: Vec<PathBuf>,
    /// Directory for exported report files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Rows shown in the top and bottom tables
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Analyze one school against the roster
    #[arg(long)]
    school: Option<String>,
    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

/// Controller state: the one roster value, replaced whole on every load.
#[derive(Default)]
struct Session {
    roster: Option<Roster>,
}

impl Session {
    fn ingest(&mut self, source: &dyn TabularSource) -> anyhow::Result<()> {
        let workbook = source
            .load()
            .with_context(|| format!("failed to load {}", source.describe()))?;
        let records = match normalize::normalize(&workbook) {
            Err(ScorecardError::EmptyResult) => anyhow::bail!(
                "no school data found in {}: add a '{}' sheet",
                source.describe(),
                normalize::REGISTER_SHEET
            ),
            other => other?,
        };

        let roster = match self.roster.take() {
            None => build_roster(records).0,
            Some(existing) => merge::merge(existing, records),
        };
        info!(schools = roster.len(), source = %source.describe(), "roster updated");
        self.roster = Some(roster);
        Ok(())
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_system_reports(
    roster: &Roster,
    stats: &SystemStats,
    top: usize,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let summary = reports::summary(stats)?;
    println!(
        "{} schools, system average {}",
        util::format_int(summary.total_schools as u64),
        util::format_score(summary.average_overall)
    );
    for (pillar, avg) in summary.pillar_averages.iter() {
        println!("  {:<26} {}", pillar.name(), util::format_score(avg));
    }
    println!();

    output::preview_table("Status Distribution", None, &reports::status_mix(stats), 4);
    output::preview_table(
        "Top Performing Schools",
        Some("by overall score"),
        &reports::top_schools(roster, top),
        top,
    );
    output::preview_table(
        "Schools Needing Attention",
        Some("lowest overall score first"),
        &reports::bottom_schools(roster, top),
        top,
    );

    let rankings_path = out_dir.join("rankings.csv");
    output::write_csv(&rankings_path, &reports::rankings(roster))?;
    let summary_path = out_dir.join("summary.json");
    output::write_json(&summary_path, &summary)?;
    println!(
        "(Full rankings exported to {}, summary to {})\n",
        rankings_path.display(),
        summary_path.display()
    );
    Ok(())
}

fn print_school_analysis(
    id: &str,
    roster: &Roster,
    stats: &SystemStats,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let school = roster
        .find(id)
        .ok_or_else(|| ScorecardError::NotFound(id.to_string()))?;
    let record = analysis::analyze(school, roster, stats)?;

    println!("{} ({})", school.name, school.id);
    println!(
        "Overall {} ({}), rank {} of {}, percentile {:.1}",
        util::format_score(school.overall_score),
        school.status,
        record.rank,
        record.roster_size,
        record.percentile
    );
    let district = &record.district;
    match district.district_average {
        Some(avg) => println!(
            "District '{}': rank {} of {}, peer average {}",
            district.district,
            district.district_rank,
            district.district_total,
            util::format_score(avg)
        ),
        None => println!("District '{}': no peer schools", district.district),
    }
    let codes = |pillars: &[Pillar]| {
        pillars.iter().map(|p| p.code()).collect::<Vec<_>>().join(", ")
    };
    println!("Strengths: {}", codes(&record.strengths));
    println!("Weaknesses: {}\n", codes(&record.weaknesses));

    let pillar_rows = reports::pillar_comparison(&record);
    let kpi_rows = reports::kpi_breakdown(&record);
    output::preview_table("Pillar Comparison", None, &pillar_rows, pillar_rows.len());
    output::preview_table(
        "KPI Breakdown",
        Some("variance against the system average"),
        &kpi_rows,
        kpi_rows.len(),
    );

    let stem = format!("school_{}", id.replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
    output::write_csv(&out_dir.join(format!("{stem}_pillars.csv")), &pillar_rows)?;
    output::write_csv(&out_dir.join(format!("{stem}_kpis.csv")), &kpi_rows)?;
    output::write_json(&out_dir.join(format!("{stem}_analysis.json")), &record)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut session = Session::default();
    for path in &cli.data {
        session.ingest(open_source(path).as_ref())?;
    }
    let roster = session.roster.take().unwrap_or_default();
    let stats = SystemStats::from_roster(&roster);

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("cannot create {}", cli.out_dir.display()))?;
    print_system_reports(&roster, &stats, cli.top, &cli.out_dir)?;
    if let Some(id) = cli.school.as_deref() {
        print_school_analysis(id, &roster, &stats, &cli.out_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_scorecard::types::{CellValue, RawRow, Workbook};

    struct Fixed(Workbook);

    impl TabularSource for Fixed {
        fn load(&self) -> bloom_scorecard::Result<Workbook> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn upload(rows: &[(&str, f64)]) -> Fixed {
        let mut wb = Workbook::new();
        let register: Vec<RawRow> = rows
            .iter()
            .map(|(id, _)| [("School ID", CellValue::Text(id.to_string()))].into_iter().collect())
            .collect();
        let ae: Vec<RawRow> = rows
            .iter()
            .map(|(id, score)| {
                [
                    ("School ID", CellValue::Text(id.to_string())),
                    ("K", CellValue::Number(*score)),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        wb.insert_sheet(normalize::REGISTER_SHEET, register);
        wb.insert_sheet("AE Input", ae);
        Fixed(wb)
    }

    #[test]
    fn second_upload_merges_into_roster() {
        let mut session = Session::default();
        session.ingest(&upload(&[("S1", 40.0), ("S2", 80.0)])).unwrap();
        session.ingest(&upload(&[("S1", 100.0), ("S3", 20.0)])).unwrap();
        let roster = session.roster.unwrap();
        let ids: Vec<&str> = roster.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn empty_register_is_reported_and_roster_survives() {
        let mut session = Session::default();
        let err = session.ingest(&Fixed(Workbook::new())).unwrap_err();
        assert!(err.to_string().contains("no school data found"));
        assert!(session.roster.is_none());

        session.ingest(&upload(&[("S1", 40.0)])).unwrap();
        assert!(session.ingest(&Fixed(Workbook::new())).is_err());
        assert_eq!(session.roster.as_ref().map(Roster::len), Some(1));
    }
}
