use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use tabled::Tabled;

use crate::util::parse_f64_safe;

/// A single untyped spreadsheet cell as handed over by a tabular source.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Classify a raw CSV field: blank is empty, everything else stays
    /// trimmed text. Numeric meaning is only taken in [`CellValue::to_score`],
    /// so ids such as `007` or 20-digit codes survive unchanged.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => !s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => true,
        }
    }

    /// Canonical string form used for ids and labels. The number `1` and the
    /// text `"1"` produce the same key.
    pub fn as_key(&self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        match self {
            CellValue::Text(s) => Some(s.trim().to_string()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Empty => None,
        }
    }

    /// Lenient numeric coercion: anything that is not a finite number is 0.
    pub fn to_score(&self) -> f64 {
        match self {
            CellValue::Number(n) if n.is_finite() => *n,
            CellValue::Number(_) | CellValue::Empty => 0.0,
            CellValue::Text(s) => parse_f64_safe(Some(s.as_str())).unwrap_or(0.0),
            CellValue::Bool(true) => 1.0,
            CellValue::Bool(false) => 0.0,
        }
    }
}

/// One row of a sheet: column header to cell, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column. A repeated header overwrites the earlier cell in place.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn first(&self) -> Option<&CellValue> {
        self.cells.first().map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| !v.is_present())
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Named sheets of rows. A sheet that was never inserted reads as empty.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, Vec<RawRow>>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sheet(&mut self, name: impl Into<String>, rows: Vec<RawRow>) {
        self.sheets.insert(name.into(), rows);
    }

    pub fn sheet(&self, name: &str) -> &[RawRow] {
        self.sheets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Pillar {
    #[serde(rename = "AE")]
    AcademicExcellence,
    #[serde(rename = "SD")]
    StudentDevelopment,
    #[serde(rename = "TL")]
    TeachingAndLearning,
    #[serde(rename = "CS")]
    CatholicSchoolIdentity,
}

impl Pillar {
    pub const ALL: [Pillar; 4] = [
        Pillar::AcademicExcellence,
        Pillar::StudentDevelopment,
        Pillar::TeachingAndLearning,
        Pillar::CatholicSchoolIdentity,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Pillar::AcademicExcellence => "AE",
            Pillar::StudentDevelopment => "SD",
            Pillar::TeachingAndLearning => "TL",
            Pillar::CatholicSchoolIdentity => "CS",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Pillar::AcademicExcellence => "Academic Excellence",
            Pillar::StudentDevelopment => "Student Development",
            Pillar::TeachingAndLearning => "Teaching & Learning",
            Pillar::CatholicSchoolIdentity => "Catholic School Identity",
        }
    }

    /// Name of the sheet holding this pillar's KPI inputs.
    pub fn input_sheet(self) -> &'static str {
        match self {
            Pillar::AcademicExcellence => "AE Input",
            Pillar::StudentDevelopment => "SD Input",
            Pillar::TeachingAndLearning => "TL Input",
            Pillar::CatholicSchoolIdentity => "CS Input",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Status {
    Excellent,
    Good,
    Developing,
    #[serde(rename = "Needs Support")]
    NeedsSupport,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Excellent,
        Status::Good,
        Status::Developing,
        Status::NeedsSupport,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Excellent => "Excellent",
            Status::Good => "Good",
            Status::Developing => "Developing",
            Status::NeedsSupport => "Needs Support",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One number per pillar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PillarScores {
    #[serde(rename = "AE")]
    pub academic_excellence: f64,
    #[serde(rename = "SD")]
    pub student_development: f64,
    #[serde(rename = "TL")]
    pub teaching_and_learning: f64,
    #[serde(rename = "CS")]
    pub catholic_school_identity: f64,
}

impl PillarScores {
    pub fn get(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::AcademicExcellence => self.academic_excellence,
            Pillar::StudentDevelopment => self.student_development,
            Pillar::TeachingAndLearning => self.teaching_and_learning,
            Pillar::CatholicSchoolIdentity => self.catholic_school_identity,
        }
    }

    pub fn set(&mut self, pillar: Pillar, value: f64) {
        match pillar {
            Pillar::AcademicExcellence => self.academic_excellence = value,
            Pillar::StudentDevelopment => self.student_development = value,
            Pillar::TeachingAndLearning => self.teaching_and_learning = value,
            Pillar::CatholicSchoolIdentity => self.catholic_school_identity = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pillar, f64)> + '_ {
        Pillar::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    pub fn mean(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum::<f64>() / Pillar::ALL.len() as f64
    }
}

/// KPI name to coerced score, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiSet {
    entries: Vec<(String, f64)>,
}

impl KpiSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kpi: impl Into<String>, score: f64) {
        let kpi = kpi.into();
        match self.entries.iter_mut().find(|(k, _)| *k == kpi) {
            Some(slot) => slot.1 = score,
            None => self.entries.push((kpi, score)),
        }
    }

    pub fn get(&self, kpi: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == kpi).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arithmetic mean of the scores, 0 for an empty set.
    pub fn average(&self) -> f64 {
        let scores: Vec<f64> = self.entries.iter().map(|(_, v)| *v).collect();
        crate::util::average(&scores)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for KpiSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut set = KpiSet::new();
        for (kpi, score) in iter {
            set.insert(kpi, score);
        }
        set
    }
}

/// Identity fields resolved from a register row.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolIdentity {
    pub id: String,
    pub name: String,
    pub district: String,
    pub school_type: String,
}

/// The canonical per-school scorecard.
///
/// Built through [`crate::scoring::score_school`], which keeps `overall_score`
/// equal to the mean of `pillar_scores` and `status` equal to its
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolRecord {
    pub id: String,
    pub name: String,
    pub district: String,
    pub school_type: String,
    pub pillar_scores: PillarScores,
    pub kpi_detail: BTreeMap<Pillar, KpiSet>,
    pub overall_score: f64,
    pub status: Status,
}

impl SchoolRecord {
    pub fn kpis(&self, pillar: Pillar) -> Option<&KpiSet> {
        self.kpi_detail.get(&pillar)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "School ID")]
    #[tabled(rename = "School ID")]
    pub school_id: String,
    #[serde(rename = "School")]
    #[tabled(rename = "School")]
    pub school: String,
    #[serde(rename = "District")]
    #[tabled(rename = "District")]
    pub district: String,
    #[serde(rename = "Type")]
    #[tabled(rename = "Type")]
    pub school_type: String,
    #[serde(rename = "AE")]
    #[tabled(rename = "AE")]
    pub ae: String,
    #[serde(rename = "SD")]
    #[tabled(rename = "SD")]
    pub sd: String,
    #[serde(rename = "TL")]
    #[tabled(rename = "TL")]
    pub tl: String,
    #[serde(rename = "CS")]
    #[tabled(rename = "CS")]
    pub cs: String,
    #[serde(rename = "Overall")]
    #[tabled(rename = "Overall")]
    pub overall: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StatusMixRow {
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Schools")]
    #[tabled(rename = "Schools")]
    pub schools: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PillarComparisonRow {
    #[serde(rename = "Pillar")]
    #[tabled(rename = "Pillar")]
    pub pillar: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "SystemAvg")]
    #[tabled(rename = "SystemAvg")]
    pub system_avg: String,
    #[serde(rename = "Variance")]
    #[tabled(rename = "Variance")]
    pub variance: String,
    #[serde(rename = "PillarRank")]
    #[tabled(rename = "PillarRank")]
    pub pillar_rank: String,
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiBreakdownRow {
    #[serde(rename = "Pillar")]
    #[tabled(rename = "Pillar")]
    pub pillar: String,
    #[serde(rename = "KPI")]
    #[tabled(rename = "KPI")]
    pub kpi: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "SystemAvg")]
    #[tabled(rename = "SystemAvg")]
    pub system_avg: String,
    #[serde(rename = "Variance")]
    #[tabled(rename = "Variance")]
    pub variance: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: NaiveDateTime,
    pub total_schools: usize,
    pub average_overall: f64,
    pub pillar_averages: PillarScores,
    pub status_counts: BTreeMap<Status, usize>,
}
