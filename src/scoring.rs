use std::collections::BTreeMap;

use crate::types::{KpiSet, Pillar, PillarScores, SchoolIdentity, SchoolRecord, Status};

pub const EXCELLENT_FLOOR: f64 = 80.0;
pub const GOOD_FLOOR: f64 = 60.0;
pub const DEVELOPING_FLOOR: f64 = 40.0;

/// Map an overall score to its status band. Lower bounds are inclusive and
/// out-of-range scores are classified as-is.
pub fn classify(overall_score: f64) -> Status {
    if overall_score >= EXCELLENT_FLOOR {
        Status::Excellent
    } else if overall_score >= GOOD_FLOOR {
        Status::Good
    } else if overall_score >= DEVELOPING_FLOOR {
        Status::Developing
    } else {
        Status::NeedsSupport
    }
}

/// Reduce each pillar's KPI set to its mean. Pillars without a set score 0.
pub fn pillar_scores(kpi_detail: &BTreeMap<Pillar, KpiSet>) -> PillarScores {
    let mut scores = PillarScores::default();
    for pillar in Pillar::ALL {
        let avg = kpi_detail.get(&pillar).map(KpiSet::average).unwrap_or(0.0);
        scores.set(pillar, avg);
    }
    scores
}

/// Assemble a scored record. Every pillar gets an entry in `kpi_detail`,
/// empty when no KPI row was found for the school.
pub fn score_school(
    identity: SchoolIdentity,
    mut kpi_detail: BTreeMap<Pillar, KpiSet>,
) -> SchoolRecord {
    for pillar in Pillar::ALL {
        kpi_detail.entry(pillar).or_default();
    }
    let pillar_scores = pillar_scores(&kpi_detail);
    let overall_score = pillar_scores.mean();
    SchoolRecord {
        id: identity.id,
        name: identity.name,
        district: identity.district,
        school_type: identity.school_type,
        pillar_scores,
        kpi_detail,
        overall_score,
        status: classify(overall_score),
    }
}
