use chrono::Local;

use crate::analysis::AnalysisRecord;
use crate::error::Result;
use crate::roster::{Roster, SystemStats};
use crate::types::{
    KpiBreakdownRow, PillarComparisonRow, RankingRow, SchoolRecord, Status, StatusMixRow,
    SummaryStats,
};
use crate::util::{format_number, format_score, format_variance};

fn ranking_row(rank: usize, school: &SchoolRecord) -> RankingRow {
    let p = &school.pillar_scores;
    RankingRow {
        rank,
        school_id: school.id.clone(),
        school: school.name.clone(),
        district: school.district.clone(),
        school_type: school.school_type.clone(),
        ae: format_score(p.academic_excellence),
        sd: format_score(p.student_development),
        tl: format_score(p.teaching_and_learning),
        cs: format_score(p.catholic_school_identity),
        overall: format_score(school.overall_score),
        status: school.status.label().to_string(),
    }
}

/// The full rankings table, one row per school in roster order.
pub fn rankings(roster: &Roster) -> Vec<RankingRow> {
    roster
        .iter()
        .enumerate()
        .map(|(idx, s)| ranking_row(idx + 1, s))
        .collect()
}

pub fn top_schools(roster: &Roster, n: usize) -> Vec<RankingRow> {
    roster
        .top(n)
        .iter()
        .enumerate()
        .map(|(idx, s)| ranking_row(idx + 1, s))
        .collect()
}

/// Weakest `n` schools, worst first, each carrying its real rank.
pub fn bottom_schools(roster: &Roster, n: usize) -> Vec<RankingRow> {
    let total = roster.len();
    roster
        .bottom(n)
        .into_iter()
        .enumerate()
        .map(|(idx, s)| ranking_row(total - idx, s))
        .collect()
}

pub fn status_mix(stats: &SystemStats) -> Vec<StatusMixRow> {
    Status::ALL
        .into_iter()
        .map(|status| {
            let schools = stats.status_count(status);
            let share = if stats.count == 0 {
                0.0
            } else {
                schools as f64 / stats.count as f64 * 100.0
            };
            StatusMixRow {
                status: status.label().to_string(),
                schools,
                share_pct: format_number(share, 1),
            }
        })
        .collect()
}

pub fn summary(stats: &SystemStats) -> Result<SummaryStats> {
    Ok(SummaryStats {
        generated_at: Local::now().naive_local(),
        total_schools: stats.count,
        average_overall: stats.average_overall()?,
        pillar_averages: stats.pillar_averages()?,
        status_counts: stats.status_counts().clone(),
    })
}

pub fn pillar_comparison(analysis: &AnalysisRecord) -> Vec<PillarComparisonRow> {
    analysis
        .pillars
        .iter()
        .map(|c| PillarComparisonRow {
            pillar: c.pillar.name().to_string(),
            score: format_score(c.score),
            system_avg: format_score(c.system_average),
            variance: format_variance(c.variance),
            pillar_rank: format!("{} of {}", c.pillar_rank, analysis.roster_size),
            min: format_score(c.min),
            max: format_score(c.max),
        })
        .collect()
}

pub fn kpi_breakdown(analysis: &AnalysisRecord) -> Vec<KpiBreakdownRow> {
    analysis
        .kpis
        .iter()
        .map(|k| KpiBreakdownRow {
            pillar: k.pillar.code().to_string(),
            kpi: k.kpi.clone(),
            score: format_score(k.score),
            system_avg: format_score(k.system_average),
            variance: format_variance(k.variance),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::roster::build_roster;
    use crate::scoring::fixtures::{flat, school};

    #[test]
    fn rankings_follow_roster_order() {
        let (roster, _) = build_roster(vec![
            flat("a", "N", 40.0),
            flat("b", "S", 82.5),
            flat("c", "S", 61.0),
        ]);
        let rows = rankings(&roster);
        let ids: Vec<&str> = rows.iter().map(|r| r.school_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].overall, "82.5");
        assert_eq!(rows[0].status, "Excellent");
        assert_eq!(rows[2].status, "Developing");
    }

    #[test]
    fn bottom_rows_carry_real_ranks() {
        let (roster, _) = build_roster(vec![
            flat("a", "", 10.0),
            flat("b", "", 90.0),
            flat("c", "", 50.0),
            flat("d", "", 70.0),
        ]);
        let rows = bottom_schools(&roster, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].rank, rows[0].school_id.as_str()), (4, "a"));
        assert_eq!((rows[1].rank, rows[1].school_id.as_str()), (3, "c"));
        assert_eq!(top_schools(&roster, 10).len(), 4);
    }

    #[test]
    fn status_mix_covers_every_band() {
        let (_, stats) = build_roster(vec![flat("a", "", 85.0), flat("b", "", 20.0)]);
        let mix = status_mix(&stats);
        assert_eq!(mix.len(), 4);
        assert_eq!(mix[0].schools, 1);
        assert_eq!(mix[0].share_pct, "50.0");
        assert_eq!(mix[1].schools, 0);
        assert_eq!(mix[3].status, "Needs Support");
    }

    #[test]
    fn summary_requires_schools() {
        let (_, stats) = build_roster(Vec::new());
        assert!(summary(&stats).is_err());

        let (_, stats) = build_roster(vec![flat("a", "", 80.0), flat("b", "", 60.0)]);
        let doc = summary(&stats).unwrap();
        assert_eq!(doc.total_schools, 2);
        assert!((doc.average_overall - 70.0).abs() < 1e-9);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["status_counts"]["Needs Support"], 0);
        assert_eq!(json["pillar_averages"]["AE"], 70.0);
    }

    #[test]
    fn analysis_rows_are_formatted() {
        let (roster, stats) = build_roster(vec![
            school("a", "", [90.0, 40.0, 60.0, 50.0]),
            school("b", "", [70.0, 80.0, 60.0, 50.0]),
        ]);
        let b = roster.find("b").unwrap().clone();
        let analysis = analyze(&b, &roster, &stats).unwrap();
        let pillars = pillar_comparison(&analysis);
        assert_eq!(pillars[0].pillar, "Academic Excellence");
        assert_eq!(pillars[0].variance, "-10.0");
        assert_eq!(pillars[0].pillar_rank, "2 of 2");
        assert_eq!(pillars[1].variance, "+20.0");
        let kpis = kpi_breakdown(&analysis);
        assert_eq!(kpis.len(), 4);
        assert_eq!(kpis[0].pillar, "AE");
        assert_eq!(kpis[0].kpi, "AE");
    }
}
