//! Turning student records into a numeric dataset.

use oxiclass_core::{MlResult, Tensor};
use oxiclass_datasets::{
    Dataset, GradeLevel, StudentRecord, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS,
};
use oxiclass_preprocessing::{HandleUnknown, OneHotEncoder};
use tracing::debug;

/// Encoded student data plus the encoder that produced it.
///
/// Columns are the four activity counts as-is, followed by one indicator
/// column per (categorical column, value) pair. Labels are the
/// [`GradeLevel`] indices, so class names are always Low, Middle, High.
#[derive(Debug, Clone)]
pub struct StudentDataset {
    pub dataset: Dataset,
    encoder: OneHotEncoder,
}

impl StudentDataset {
    /// Learn the category vocabulary from `records` and encode them.
    pub fn from_records(records: &[StudentRecord]) -> MlResult<Self> {
        let categorical = categorical_rows(records);

        // Later batches (e.g. a new term's file) may carry unseen categories.
        let mut encoder = OneHotEncoder::new(HandleUnknown::Ignore);
        let one_hot = encoder.fit_transform(&categorical)?;
        let numeric = numeric_matrix(records)?;
        let x = Tensor::hstack(&[&numeric, &one_hot])?;

        let mut feature_names: Vec<String> =
            NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect();
        feature_names.extend(encoder.feature_names(&CATEGORICAL_COLUMNS)?);
        let class_names = GradeLevel::ALL.iter().map(|g| g.name().to_string()).collect();
        let y = records.iter().map(|r| r.class.index()).collect();

        debug!(rows = records.len(), features = feature_names.len(), "encoded student records");
        Ok(StudentDataset {
            dataset: Dataset::new(x, y, feature_names, class_names)?,
            encoder,
        })
    }

    /// Encode further records with the vocabulary learned in `from_records`.
    pub fn encode(&self, records: &[StudentRecord]) -> MlResult<Tensor<f64>> {
        let one_hot = self.encoder.transform(&categorical_rows(records))?;
        Tensor::hstack(&[&numeric_matrix(records)?, &one_hot])
    }
}

fn categorical_rows(records: &[StudentRecord]) -> Vec<Vec<&str>> {
    records
        .iter()
        .map(|r| r.categorical_values().to_vec())
        .collect()
}

fn numeric_matrix(records: &[StudentRecord]) -> MlResult<Tensor<f64>> {
    let data: Vec<f64> = records.iter().flat_map(|r| r.numeric_values()).collect();
    Tensor::new(data, vec![records.len(), NUMERIC_COLUMNS.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiclass_datasets::read_students;

    const CSV: &str = "\
gender,NationalITy,PlaceofBirth,StageID,GradeID,SectionID,Topic,Semester,Relation,raisedhands,VisITedResources,AnnouncementsView,Discussion,ParentAnsweringSurvey,ParentschoolSatisfaction,StudentAbsenceDays,Class
M,KW,KuwaIT,lowerlevel,G-04,A,IT,F,Father,15,16,2,20,Yes,Good,Under-7,M
F,KW,KuwaIT,MiddleSchool,G-07,B,Math,S,Mum,80,90,50,40,Yes,Good,Under-7,H
M,Jordan,Jordan,lowerlevel,G-02,A,IT,F,Father,5,3,1,8,No,Bad,Above-7,L
";

    #[test]
    fn test_from_records_layout() {
        let records = read_students(CSV.as_bytes()).unwrap();
        let students = StudentDataset::from_records(&records).unwrap();
        let ds = &students.dataset;

        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.y, vec![1, 2, 0]);
        assert_eq!(ds.class_names, vec!["Low", "Middle", "High"]);
        assert_eq!(&ds.feature_names[..4], &NUMERIC_COLUMNS.map(String::from));
        assert!(ds.feature_names.contains(&"gender=F".to_string()));
        assert_eq!(ds.x.row(1).unwrap()[..4], [80.0, 90.0, 50.0, 40.0]);

        // each categorical column contributes exactly one hot cell per row
        let one_hot_sum: f64 = ds.x.row(0).unwrap()[4..].iter().sum();
        assert_eq!(one_hot_sum, CATEGORICAL_COLUMNS.len() as f64);
    }

    #[test]
    fn test_encode_ignores_unseen_categories() {
        let records = read_students(CSV.as_bytes()).unwrap();
        let students = StudentDataset::from_records(&records[..2]).unwrap();
        let x = students.encode(&records[2..]).unwrap();
        assert_eq!(x.n_cols().unwrap(), students.dataset.n_features());
        let one_hot_sum: f64 = x.row(0).unwrap()[4..].iter().sum();
        assert!(one_hot_sum < CATEGORICAL_COLUMNS.len() as f64);
    }
}
