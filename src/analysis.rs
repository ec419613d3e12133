//! Relative standing of one school against the roster it belongs to.
//!
//! Everything here is a pure function of `(school, roster, stats)` and is
//! recomputed from scratch whenever the selected school or roster changes.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{Result, ScorecardError};
use crate::roster::{Roster, SystemStats};
use crate::types::{Pillar, SchoolRecord};
use crate::util::round_to;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarComparison {
    pub pillar: Pillar,
    pub score: f64,
    pub system_average: f64,
    pub variance: f64,
    /// Number of schools strictly above this score, plus one. Ties share the
    /// rank of the best-placed member.
    pub pillar_rank: usize,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictComparison {
    pub district: String,
    /// Mean overall score of the other schools in the district, `None` when
    /// the school is alone there.
    pub district_average: Option<f64>,
    pub district_rank: usize,
    pub district_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiVariance {
    pub pillar: Pillar,
    pub kpi: String,
    pub score: f64,
    pub system_average: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub school_id: String,
    pub school_name: String,
    pub overall_score: f64,
    pub rank: usize,
    pub roster_size: usize,
    pub percentile: f64,
    pub pillars: Vec<PillarComparison>,
    pub strengths: Vec<Pillar>,
    pub weaknesses: Vec<Pillar>,
    pub district: DistrictComparison,
    pub kpis: Vec<KpiVariance>,
}

impl AnalysisRecord {
    pub fn pillar(&self, pillar: Pillar) -> Option<&PillarComparison> {
        self.pillars.iter().find(|c| c.pillar == pillar)
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Share of the roster ranked below `rank`, 0-100 with one decimal.
pub fn percentile(rank: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    round_to((n - rank.min(n)) as f64 / n as f64 * 100.0, 1)
}

fn compare_pillar(
    pillar: Pillar,
    school: &SchoolRecord,
    roster: &Roster,
    stats: &SystemStats,
) -> Result<PillarComparison> {
    let score = school.pillar_scores.get(pillar);
    let system_average = stats.pillar_average(pillar)?;
    let scores = roster.iter().map(|s| s.pillar_scores.get(pillar));
    let pillar_rank = scores.clone().filter(|v| *v > score).count() + 1;
    let min = scores.clone().fold(f64::INFINITY, f64::min);
    let max = scores.fold(f64::NEG_INFINITY, f64::max);
    Ok(PillarComparison {
        pillar,
        score,
        system_average,
        variance: score - system_average,
        pillar_rank,
        min,
        max,
    })
}

/// Compare a school with the other schools of its district.
pub fn compare_district(school: &SchoolRecord, roster: &Roster) -> DistrictComparison {
    let peers: Vec<&SchoolRecord> = roster
        .iter()
        .filter(|s| s.district == school.district && s.id != school.id)
        .collect();

    if peers.is_empty() {
        return DistrictComparison {
            district: school.district.clone(),
            district_average: None,
            district_rank: 1,
            district_total: 1,
        };
    }

    let peer_scores: Vec<f64> = peers.iter().map(|s| s.overall_score).collect();
    let district_average = crate::util::average(&peer_scores);

    let mut group = peers;
    group.push(school);
    group.sort_by(|a, b| descending(a.overall_score, b.overall_score));
    let district_rank = group
        .iter()
        .position(|s| s.id == school.id)
        .map_or(group.len(), |idx| idx + 1);

    DistrictComparison {
        district: school.district.clone(),
        district_average: Some(district_average),
        district_rank,
        district_total: group.len(),
    }
}

/// Per-KPI variance against the roster mean. Schools lacking a KPI count as
/// 0 towards its mean rather than being left out.
pub fn kpi_breakdown(school: &SchoolRecord, roster: &Roster) -> Vec<KpiVariance> {
    let n = roster.len().max(1) as f64;
    let mut rows = Vec::new();
    for pillar in Pillar::ALL {
        let Some(kpis) = school.kpis(pillar) else {
            continue;
        };
        for (kpi, score) in kpis.iter() {
            let total: f64 = roster
                .iter()
                .map(|s| s.kpis(pillar).and_then(|set| set.get(kpi)).unwrap_or(0.0))
                .sum();
            let system_average = total / n;
            rows.push(KpiVariance {
                pillar,
                kpi: kpi.to_string(),
                score,
                system_average,
                variance: score - system_average,
            });
        }
    }
    rows
}

/// Full comparative analysis of `school` within `roster`.
///
/// Fails with [`ScorecardError::NotFound`] when the school's id is not in the
/// roster.
pub fn analyze(
    school: &SchoolRecord,
    roster: &Roster,
    stats: &SystemStats,
) -> Result<AnalysisRecord> {
    let rank = roster
        .rank_of(&school.id)
        .ok_or_else(|| ScorecardError::NotFound(school.id.clone()))?;
    let n = roster.len();

    let pillars = Pillar::ALL
        .into_iter()
        .map(|p| compare_pillar(p, school, roster, stats))
        .collect::<Result<Vec<_>>>()?;

    let mut by_score: Vec<&PillarComparison> = pillars.iter().collect();
    by_score.sort_by(|a, b| descending(a.score, b.score));
    let (strengths, weaknesses): (Vec<_>, Vec<_>) =
        by_score.into_iter().partition(|c| c.variance > 0.0);

    Ok(AnalysisRecord {
        school_id: school.id.clone(),
        school_name: school.name.clone(),
        overall_score: school.overall_score,
        rank,
        roster_size: n,
        percentile: percentile(rank, n),
        strengths: strengths.into_iter().map(|c| c.pillar).collect(),
        weaknesses: weaknesses.into_iter().map(|c| c.pillar).collect(),
        district: compare_district(school, roster),
        kpis: kpi_breakdown(school, roster),
        pillars,
    })
}
