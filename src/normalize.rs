use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::error::{Result, ScorecardError};
use crate::scoring::score_school;
use crate::types::{CellValue, KpiSet, Pillar, RawRow, SchoolIdentity, SchoolRecord, Workbook};

pub const REGISTER_SHEET: &str = "School Register";

// Alias lists are tried in order; the first present cell wins.
pub const KPI_ID_ALIASES: &[&str] = &["School ID", "SchoolID", "school_id"];
pub const REGISTER_ID_ALIASES: &[&str] = &["School ID", "SchoolID", "school_id", "ID", "id"];
pub const NAME_ALIASES: &[&str] = &["School Name", "SchoolName", "school_name", "Name", "name"];
pub const DISTRICT_ALIASES: &[&str] = &["District", "district", "Region", "region"];
pub const TYPE_ALIASES: &[&str] = &["Type", "type", "Category", "category"];

/// Every sheet the normalizer reads, register first.
pub fn sheet_names() -> [&'static str; 5] {
    [
        REGISTER_SHEET,
        Pillar::AcademicExcellence.input_sheet(),
        Pillar::StudentDevelopment.input_sheet(),
        Pillar::TeachingAndLearning.input_sheet(),
        Pillar::CatholicSchoolIdentity.input_sheet(),
    ]
}

pub fn resolve_alias<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a CellValue> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .find(|cell| cell.is_present())
}

fn resolve_text(row: &RawRow, aliases: &[&str], default: String) -> String {
    resolve_alias(row, aliases)
        .and_then(CellValue::as_key)
        .unwrap_or(default)
}

/// Build the KPI set of every school in one pillar's input table.
///
/// KPI columns are the row's columns minus the id aliases. Rows without an id
/// are dropped; a repeated id keeps the last row.
pub fn kpi_map(rows: &[RawRow]) -> HashMap<String, KpiSet> {
    let mut map = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let Some(id) = resolve_alias(row, KPI_ID_ALIASES).and_then(CellValue::as_key) else {
            debug!(row = idx + 1, "dropping KPI row without a school id");
            continue;
        };
        let kpis: KpiSet = row
            .columns()
            .filter(|(column, _)| !KPI_ID_ALIASES.contains(column))
            .map(|(column, cell)| (column, cell.to_score()))
            .collect();
        if map.insert(id.clone(), kpis).is_some() {
            debug!(school_id = %id, "duplicate KPI row, keeping the later one");
        }
    }
    map
}

fn resolve_identity(row: &RawRow, position: usize) -> SchoolIdentity {
    let id = resolve_alias(row, REGISTER_ID_ALIASES)
        .and_then(CellValue::as_key)
        .or_else(|| row.first().and_then(CellValue::as_key))
        .unwrap_or_else(|| position.to_string());
    let name = resolve_text(row, NAME_ALIASES, format!("School {id}"));
    let district = resolve_text(row, DISTRICT_ALIASES, String::new());
    let school_type = resolve_text(row, TYPE_ALIASES, String::new());
    SchoolIdentity {
        id,
        name,
        district,
        school_type,
    }
}

/// Turn a workbook into one scored record per school id, in register order.
/// Fails only when the register is missing or has no rows.
///
/// A repeated register id keeps the later row, placed where the id first
/// appeared, so every id names exactly one record.
pub fn normalize(workbook: &Workbook) -> Result<Vec<SchoolRecord>> {
    let register = workbook.sheet(REGISTER_SHEET);
    if register.is_empty() {
        return Err(ScorecardError::EmptyResult);
    }

    let pillar_maps: Vec<(Pillar, HashMap<String, KpiSet>)> = Pillar::ALL
        .into_iter()
        .map(|p| (p, kpi_map(workbook.sheet(p.input_sheet()))))
        .collect();

    let mut records: Vec<SchoolRecord> = Vec::with_capacity(register.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for (idx, row) in register.iter().enumerate() {
        let identity = resolve_identity(row, idx + 1);
        let kpi_detail: BTreeMap<Pillar, KpiSet> = pillar_maps
            .iter()
            .filter_map(|(p, map)| map.get(&identity.id).map(|set| (*p, set.clone())))
            .collect();
        let record = score_school(identity, kpi_detail);
        match index.get(&record.id) {
            Some(&slot) => {
                debug!(
                    school_id = %record.id,
                    row = idx + 1,
                    "duplicate register id, keeping the later row"
                );
                records[slot] = record;
            }
            None => {
                index.insert(record.id.clone(), records.len());
                records.push(record);
            }
        }
    }

    info!(schools = records.len(), "normalized register");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        cells.iter().cloned().collect()
    }

    fn num(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn text(v: &str) -> CellValue {
        CellValue::Text(v.to_string())
    }

    #[test]
    fn end_to_end_example_scores_and_orders() {
        let mut wb = Workbook::new();
        wb.insert_sheet(
            REGISTER_SHEET,
            vec![
                row(&[("School ID", num(1.0)), ("Name", text("A"))]),
                row(&[("School ID", num(2.0)), ("Name", text("B"))]),
            ],
        );
        wb.insert_sheet(
            "AE Input",
            vec![
                row(&[("School ID", num(1.0)), ("K1", num(80.0)), ("K2", num(90.0))]),
                row(&[("School ID", num(2.0)), ("K1", num(40.0)), ("K2", num(60.0))]),
            ],
        );
        wb.insert_sheet("SD Input", vec![]);

        let records = normalize(&wb).unwrap();
        assert_eq!(records.len(), 2);
        let a = &records[0];
        assert_eq!(a.id, "1");
        assert_eq!(a.name, "A");
        assert!((a.pillar_scores.academic_excellence - 85.0).abs() < 1e-9);
        assert_eq!(a.pillar_scores.student_development, 0.0);
        assert!((a.overall_score - 21.25).abs() < 1e-9);
        assert_eq!(a.status, Status::NeedsSupport);
        let b = &records[1];
        assert!((b.pillar_scores.academic_excellence - 50.0).abs() < 1e-9);
        assert!((b.overall_score - 12.5).abs() < 1e-9);
        assert_eq!(b.status, Status::NeedsSupport);

        let (roster, _) = crate::roster::build_roster(records);
        let order: Vec<&str> = roster.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["1", "2"]);
    }

    #[test]
    fn missing_register_is_empty_result() {
        let wb = Workbook::new();
        assert!(matches!(normalize(&wb), Err(ScorecardError::EmptyResult)));

        let mut wb = Workbook::new();
        wb.insert_sheet(REGISTER_SHEET, vec![]);
        wb.insert_sheet("AE Input", vec![row(&[("School ID", num(1.0)), ("K", num(1.0))])]);
        assert!(matches!(normalize(&wb), Err(ScorecardError::EmptyResult)));
    }

    #[test]
    fn register_drives_membership() {
        let mut wb = Workbook::new();
        wb.insert_sheet(REGISTER_SHEET, vec![row(&[("SchoolID", text("S1"))])]);
        wb.insert_sheet(
            "TL Input",
            vec![
                row(&[("SchoolID", text("S1")), ("Lesson", num(70.0))]),
                row(&[("SchoolID", text("S2")), ("Lesson", num(99.0))]),
            ],
        );
        let records = normalize(&wb).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "S1");
        assert!((records[0].pillar_scores.teaching_and_learning - 70.0).abs() < 1e-9);
    }

    #[test]
    fn identity_aliases_follow_priority_and_defaults() {
        let r = row(&[
            ("ID", text("x")),
            ("school_id", num(7.0)),
            ("Region", text("East")),
            ("district", text("West")),
            ("category", text("Secondary")),
        ]);
        let identity = resolve_identity(&r, 3);
        assert_eq!(identity.id, "7");
        assert_eq!(identity.name, "School 7");
        assert_eq!(identity.district, "West");
        assert_eq!(identity.school_type, "Secondary");
    }

    #[test]
    fn id_falls_back_to_first_column_then_position() {
        let by_first = row(&[("Code", text("C-9")), ("Name", text("Holy Cross"))]);
        assert_eq!(resolve_identity(&by_first, 4).id, "C-9");

        let blank_first = row(&[("Code", CellValue::Empty), ("Name", text("St. Jude"))]);
        let identity = resolve_identity(&blank_first, 4);
        assert_eq!(identity.id, "4");
        assert_eq!(identity.name, "St. Jude");
    }

    #[test]
    fn empty_alias_cells_are_skipped() {
        let r = row(&[("School ID", CellValue::Empty), ("SchoolID", text("  S5 "))]);
        assert_eq!(resolve_identity(&r, 1).id, "S5");
    }

    #[test]
    fn kpi_rows_degrade_leniently() {
        let rows = vec![
            row(&[
                ("School ID", num(1.0)),
                ("SchoolID", text("ignored")),
                ("Attendance", text("90")),
                ("Retention", text("n/a")),
                ("Survey", CellValue::Empty),
            ]),
            row(&[("Attendance", num(50.0))]),
        ];
        let map = kpi_map(&rows);
        assert_eq!(map.len(), 1);
        let set = &map["1"];
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("Attendance"), Some(90.0));
        assert_eq!(set.get("Retention"), Some(0.0));
        assert_eq!(set.get("Survey"), Some(0.0));
        assert!(set.get("SchoolID").is_none());
        assert!((set.average() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn numeric_and_text_ids_join() {
        let mut wb = Workbook::new();
        wb.insert_sheet(REGISTER_SHEET, vec![row(&[("School ID", text("12"))])]);
        wb.insert_sheet("CS Input", vec![row(&[("School ID", num(12.0)), ("Faith", num(88.0))])]);
        let records = normalize(&wb).unwrap();
        assert!((records[0].pillar_scores.catholic_school_identity - 88.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_kpi_ids_keep_last_row() {
        let rows = vec![
            row(&[("School ID", num(1.0)), ("K", num(10.0))]),
            row(&[("School ID", num(1.0)), ("K", num(30.0))]),
        ];
        assert_eq!(kpi_map(&rows)["1"].get("K"), Some(30.0));
    }

    #[test]
    fn duplicate_register_ids_keep_last_row() {
        let mut wb = Workbook::new();
        wb.insert_sheet(
            REGISTER_SHEET,
            vec![
                row(&[("School ID", text("A")), ("Name", text("Old Name"))]),
                row(&[("School ID", text("B")), ("Name", text("Other"))]),
                row(&[("School ID", text("A")), ("Name", text("New Name"))]),
            ],
        );
        let records = normalize(&wb).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(records[0].name, "New Name");

        // A re-upload then replaces the only copy of the school.
        let (roster, _) = crate::roster::build_roster(records);
        let mut upload = Workbook::new();
        upload.insert_sheet(
            REGISTER_SHEET,
            vec![row(&[("School ID", text("A")), ("Name", text("Renamed"))])],
        );
        upload.insert_sheet("AE Input", vec![row(&[("School ID", text("A")), ("K", num(80.0))])]);
        let roster = crate::merge::merge(roster, normalize(&upload).unwrap());
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.iter().filter(|s| s.id == "A").count(), 1);
        assert_eq!(roster.find("A").map(|s| s.name.as_str()), Some("Renamed"));
        assert_eq!(roster.rank_of("A"), Some(1));
    }
}
