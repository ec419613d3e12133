use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{Result, ScorecardError};
use crate::types::{Pillar, PillarScores, SchoolRecord, Status};

/// Schools ordered by overall score, best first.
///
/// The sort is stable and has no secondary key, so equal scores keep the
/// order in which records arrived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    schools: Vec<SchoolRecord>,
}

fn sort_by_overall(schools: &mut [SchoolRecord]) {
    schools.sort_by(|a, b| {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(Ordering::Equal)
    });
}

impl Roster {
    pub fn from_records(mut schools: Vec<SchoolRecord>) -> Self {
        sort_by_overall(&mut schools);
        Self { schools }
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchoolRecord> {
        self.schools.iter()
    }

    pub fn as_slice(&self) -> &[SchoolRecord] {
        &self.schools
    }

    pub fn into_vec(self) -> Vec<SchoolRecord> {
        self.schools
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.schools.iter().position(|s| s.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&SchoolRecord> {
        self.schools.iter().find(|s| s.id == id)
    }

    /// 1-based rank of a school.
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.position(id).map(|idx| idx + 1)
    }

    /// Best `n` schools, best first.
    pub fn top(&self, n: usize) -> &[SchoolRecord] {
        &self.schools[..n.min(self.schools.len())]
    }

    /// Worst `n` schools, worst first.
    pub fn bottom(&self, n: usize) -> Vec<&SchoolRecord> {
        self.schools.iter().rev().take(n).collect()
    }
}

/// System-wide aggregates over a roster.
///
/// Only totals and counts are stored; averages are divided out on request so
/// an empty roster reports [`ScorecardError::EmptyRoster`] instead of NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStats {
    pub count: usize,
    overall_total: f64,
    pillar_totals: PillarScores,
    status_counts: BTreeMap<Status, usize>,
}

impl SystemStats {
    pub fn from_roster(roster: &Roster) -> Self {
        let mut overall_total = 0.0;
        let mut pillar_totals = PillarScores::default();
        let mut status_counts: BTreeMap<Status, usize> =
            Status::ALL.into_iter().map(|s| (s, 0)).collect();

        for school in roster.iter() {
            overall_total += school.overall_score;
            for (pillar, score) in school.pillar_scores.iter() {
                pillar_totals.set(pillar, pillar_totals.get(pillar) + score);
            }
            *status_counts.entry(school.status).or_insert(0) += 1;
        }

        Self {
            count: roster.len(),
            overall_total,
            pillar_totals,
            status_counts,
        }
    }

    fn divisor(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(ScorecardError::EmptyRoster);
        }
        Ok(self.count as f64)
    }

    pub fn average_overall(&self) -> Result<f64> {
        Ok(self.overall_total / self.divisor()?)
    }

    pub fn pillar_average(&self, pillar: Pillar) -> Result<f64> {
        Ok(self.pillar_totals.get(pillar) / self.divisor()?)
    }

    pub fn pillar_averages(&self) -> Result<PillarScores> {
        let n = self.divisor()?;
        let mut averages = PillarScores::default();
        for (pillar, total) in self.pillar_totals.iter() {
            averages.set(pillar, total / n);
        }
        Ok(averages)
    }

    /// Count per status label; every label is present, possibly with 0.
    pub fn status_counts(&self) -> &BTreeMap<Status, usize> {
        &self.status_counts
    }

    pub fn status_count(&self, status: Status) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}

/// Sort records into a roster and compute its statistics.
pub fn build_roster(records: Vec<SchoolRecord>) -> (Roster, SystemStats) {
    let roster = Roster::from_records(records);
    let stats = SystemStats::from_roster(&roster);
    (roster, stats)
}
