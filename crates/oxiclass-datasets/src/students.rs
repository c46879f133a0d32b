use crate::grade::GradeLevel;
use oxiclass_io::{read_records, read_records_path, IoError};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default location of the exercise file, relative to the working directory.
pub const DEFAULT_STUDENTS_PATH: &str = "data/students.csv";

/// Categorical columns, in file order.
pub const CATEGORICAL_COLUMNS: [&str; 12] = [
    "gender",
    "NationalITy",
    "PlaceofBirth",
    "StageID",
    "GradeID",
    "SectionID",
    "Topic",
    "Semester",
    "Relation",
    "ParentAnsweringSurvey",
    "ParentschoolSatisfaction",
    "StudentAbsenceDays",
];

/// Numeric engagement counters (0-100), in file order.
pub const NUMERIC_COLUMNS: [&str; 4] = [
    "raisedhands",
    "VisITedResources",
    "AnnouncementsView",
    "Discussion",
];

pub const LABEL_COLUMN: &str = "Class";

/// One row of the student-performance file.
///
/// Columns:
/// - `gender`: `M` / `F`
/// - `NationalITy`, `PlaceofBirth`: country
/// - `StageID`: `lowerlevel`, `MiddleSchool`, `HighSchool`
/// - `GradeID`: `G-01` .. `G-12`
/// - `SectionID`: classroom `A` / `B` / `C`
/// - `Topic`: course topic
/// - `Semester`: `F` (first) / `S` (second)
/// - `Relation`: parent responsible for the student (`Father` / `Mum`)
/// - `raisedhands`, `VisITedResources`, `AnnouncementsView`, `Discussion`:
///   engagement counts 0-100
/// - `ParentAnsweringSurvey`, `ParentschoolSatisfaction`: `Yes`/`No`, `Good`/`Bad`
/// - `StudentAbsenceDays`: `Under-7` / `Above-7`
/// - `Class`: `L`, `M` or `H` (see [`GradeLevel`])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub gender: String,
    #[serde(rename = "NationalITy")]
    pub nationality: String,
    #[serde(rename = "PlaceofBirth")]
    pub place_of_birth: String,
    #[serde(rename = "StageID")]
    pub stage_id: String,
    #[serde(rename = "GradeID")]
    pub grade_id: String,
    #[serde(rename = "SectionID")]
    pub section_id: String,
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Semester")]
    pub semester: String,
    #[serde(rename = "Relation")]
    pub relation: String,
    #[serde(rename = "raisedhands")]
    pub raised_hands: u32,
    #[serde(rename = "VisITedResources")]
    pub visited_resources: u32,
    #[serde(rename = "AnnouncementsView")]
    pub announcements_view: u32,
    #[serde(rename = "Discussion")]
    pub discussion: u32,
    #[serde(rename = "ParentAnsweringSurvey")]
    pub parent_answering_survey: String,
    #[serde(rename = "ParentschoolSatisfaction")]
    pub parent_school_satisfaction: String,
    #[serde(rename = "StudentAbsenceDays")]
    pub student_absence_days: String,
    #[serde(rename = "Class", deserialize_with = "deserialize_grade")]
    pub class: GradeLevel,
}

fn deserialize_grade<'de, D: Deserializer<'de>>(d: D) -> Result<GradeLevel, D::Error> {
    let code = String::deserialize(d)?;
    GradeLevel::from_code(&code).map_err(serde::de::Error::custom)
}

impl StudentRecord {
    /// Categorical values in [`CATEGORICAL_COLUMNS`] order.
    pub fn categorical_values(&self) -> [&str; 12] {
        [
            self.gender.as_str(),
            self.nationality.as_str(),
            self.place_of_birth.as_str(),
            self.stage_id.as_str(),
            self.grade_id.as_str(),
            self.section_id.as_str(),
            self.topic.as_str(),
            self.semester.as_str(),
            self.relation.as_str(),
            self.parent_answering_survey.as_str(),
            self.parent_school_satisfaction.as_str(),
            self.student_absence_days.as_str(),
        ]
    }

    /// Numeric values in [`NUMERIC_COLUMNS`] order.
    pub fn numeric_values(&self) -> [f64; 4] {
        [
            self.raised_hands as f64,
            self.visited_resources as f64,
            self.announcements_view as f64,
            self.discussion as f64,
        ]
    }
}

#[derive(Debug, Error)]
pub enum StudentsError {
    #[error("cannot read student records from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error(transparent)]
    Parse(#[from] IoError),
    #[error("no student records found")]
    Empty,
}

/// Load the student-performance CSV.
pub fn load_students<P: AsRef<Path>>(path: P) -> Result<Vec<StudentRecord>, StudentsError> {
    let path = path.as_ref();
    let records: Vec<StudentRecord> =
        read_records_path(path).map_err(|source| StudentsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if records.is_empty() {
        return Err(StudentsError::Empty);
    }
    info!(path = %path.display(), students = records.len(), "loaded student records");
    Ok(records)
}

/// Parse student records from any reader.
pub fn read_students<R: Read>(reader: R) -> Result<Vec<StudentRecord>, StudentsError> {
    let records: Vec<StudentRecord> = read_records(reader)?;
    if records.is_empty() {
        return Err(StudentsError::Empty);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
gender,NationalITy,PlaceofBirth,StageID,GradeID,SectionID,Topic,Semester,Relation,raisedhands,VisITedResources,AnnouncementsView,Discussion,ParentAnsweringSurvey,ParentschoolSatisfaction,StudentAbsenceDays,Class
M,KW,KuwaIT,lowerlevel,G-04,A,IT,F,Father,15,16,2,20,Yes,Good,Under-7,M
F,Jordan,Jordan,MiddleSchool,G-07,B,Math,S,Mum,90,88,70,45,Yes,Good,Under-7,H
M,Iraq,Iraq,HighSchool,G-11,A,Arabic,F,Father,5,3,1,8,No,Bad,Above-7,L
";

    #[test]
    fn test_read_students() {
        let students = read_students(SAMPLE.as_bytes()).unwrap();
        assert_eq!(students.len(), 3);
        assert_eq!(students[0].class, GradeLevel::Middle);
        assert_eq!(students[1].class, GradeLevel::High);
        assert_eq!(students[2].class, GradeLevel::Low);
        assert_eq!(students[1].numeric_values(), [90.0, 88.0, 70.0, 45.0]);
        assert_eq!(students[2].categorical_values()[11], "Above-7");
        assert_eq!(students[0].categorical_values()[1], "KW");
    }

    #[test]
    fn test_unknown_class_code_fails() {
        let bad = SAMPLE.replace("Above-7,L", "Above-7,Z");
        assert!(matches!(read_students(bad.as_bytes()), Err(StudentsError::Parse(_))));
    }

    #[test]
    fn test_header_only_is_empty() {
        let header = SAMPLE.lines().next().unwrap();
        assert!(matches!(read_students(header.as_bytes()), Err(StudentsError::Empty)));
    }

    #[test]
    fn test_load_students_missing_file() {
        assert!(matches!(
            load_students("/no/such/students.csv"),
            Err(StudentsError::Read { .. })
        ));
    }

    #[test]
    fn test_load_students_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_students(&path).unwrap().len(), 3);
    }
}
