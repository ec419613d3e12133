use std::collections::HashMap;

use tracing::info;

use crate::roster::Roster;
use crate::types::SchoolRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub replaced: usize,
    pub appended: usize,
}

/// Upsert `incoming` into `existing` by school id and re-sort.
///
/// A matching id replaces the whole record in place; anything else is
/// appended. The final stable sort means replaced records keep their slot
/// among equal scores.
pub fn merge(existing: Roster, incoming: Vec<SchoolRecord>) -> Roster {
    merge_with_summary(existing, incoming).0
}

pub fn merge_with_summary(
    existing: Roster,
    incoming: Vec<SchoolRecord>,
) -> (Roster, MergeSummary) {
    let mut schools = existing.into_vec();
    let mut index: HashMap<String, usize> = schools
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.id.clone(), idx))
        .collect();
    let mut summary = MergeSummary::default();

    for record in incoming {
        match index.get(&record.id) {
            Some(&idx) => {
                schools[idx] = record;
                summary.replaced += 1;
            }
            None => {
                index.insert(record.id.clone(), schools.len());
                schools.push(record);
                summary.appended += 1;
            }
        }
    }

    info!(
        replaced = summary.replaced,
        appended = summary.appended,
        total = schools.len(),
        "merged batch into roster"
    );
    (Roster::from_records(schools), summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::fixtures::flat;

    fn ids(roster: &Roster) -> Vec<&str> {
        roster.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn merging_nothing_is_identity() {
        let roster = Roster::from_records(vec![
            flat("a", "", 50.0),
            flat("b", "", 50.0),
            flat("c", "", 90.0),
        ]);
        let merged = merge(roster.clone(), Vec::new());
        assert_eq!(merged, roster);
    }

    #[test]
    fn upsert_replaces_and_repositions() {
        let roster = Roster::from_records(vec![
            flat("S0", "", 70.0),
            flat("S1", "", 50.0),
            flat("S2", "", 30.0),
        ]);
        let (merged, summary) = merge_with_summary(roster, vec![flat("S1", "", 90.0)]);
        assert_eq!(summary, MergeSummary { replaced: 1, appended: 0 });
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.iter().filter(|s| s.id == "S1").count(), 1);
        assert_eq!(ids(&merged), vec!["S1", "S0", "S2"]);
        assert!((merged.as_slice()[0].overall_score - 90.0).abs() < 1e-9);
    }

    #[test]
    fn new_ids_are_appended_then_sorted() {
        let roster = Roster::from_records(vec![flat("a", "", 60.0)]);
        let (merged, summary) =
            merge_with_summary(roster, vec![flat("b", "", 80.0), flat("c", "", 60.0)]);
        assert_eq!(summary, MergeSummary { replaced: 0, appended: 2 });
        assert_eq!(ids(&merged), vec!["b", "a", "c"]);
    }

    #[test]
    fn repeated_incoming_id_keeps_last() {
        let roster = Roster::default();
        let merged = merge(roster, vec![flat("x", "", 20.0), flat("x", "", 40.0)]);
        assert_eq!(merged.len(), 1);
        assert!((merged.as_slice()[0].overall_score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn replacement_is_whole_record() {
        let mut original = flat("a", "North", 60.0);
        original.name = "Old Name".into();
        let roster = Roster::from_records(vec![original]);
        let merged = merge(roster, vec![flat("a", "South", 60.0)]);
        let school = merged.find("a").unwrap();
        assert_eq!(school.district, "South");
        assert_eq!(school.name, "School a");
    }
}
