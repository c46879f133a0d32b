//! End-to-end runs of the walkthrough: synthetic demo and student records.

use std::fs;
use std::io::Write;

use approx::assert_abs_diff_eq;

use oxiclass::Classifier;
use oxiclass::datasets::{load_students, make_classification, GradeLevel};
use oxiclass::workflow::{
    label_distribution, load_config, render_count_plot, render_report_table, Experiment,
    ExperimentConfig, ModelSpec, ScalerKind, StudentDataset, WorkflowError,
};

const HEADER: &str = "gender,NationalITy,PlaceofBirth,StageID,GradeID,SectionID,Topic,Semester,Relation,raisedhands,VisITedResources,AnnouncementsView,Discussion,ParentAnsweringSurvey,ParentschoolSatisfaction,StudentAbsenceDays,Class";

/// Engagement counts track the grade level, so the classes are learnable.
fn write_students(n: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for i in 0..n {
        let (code, base, absence) = match i % 3 {
            0 => ("L", 8, "Above-7"),
            1 => ("M", 45, "Under-7"),
            _ => ("H", 85, "Under-7"),
        };
        let jitter = (i * 7) % 10;
        let gender = if i % 2 == 0 { "M" } else { "F" };
        let topic = ["IT", "Math", "Arabic", "Science"][i % 4];
        writeln!(
            file,
            "{gender},KW,KuwaIT,MiddleSchool,G-07,A,{topic},F,Father,{},{},{},{},Yes,Good,{absence},{code}",
            base + jitter,
            base + (jitter * 3) % 10,
            base - jitter.min(base),
            base + jitter / 2,
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn fast_models() -> Vec<ModelSpec> {
    ModelSpec::default_zoo()
        .into_iter()
        .filter(|m| m.kind() != "svc" && m.kind() != "gradient_boosting")
        .collect()
}

#[test]
fn test_students_end_to_end() {
    let file = write_students(90);
    let records = load_students(file.path()).unwrap();
    assert_eq!(records.len(), 90);

    let students = StudentDataset::from_records(&records).unwrap();
    let counts = label_distribution(&students.dataset);
    assert_eq!(counts.len(), 3);
    assert!(counts.iter().all(|c| c.count == 30));
    assert_eq!(counts[0].class, GradeLevel::Low.name());
    assert_eq!(render_count_plot(&counts).lines().count(), 3);

    let config = ExperimentConfig {
        stratify: true,
        models: fast_models(),
        ..ExperimentConfig::default()
    };
    let n_models = config.models.len();
    let reports = Experiment::new(config).run(&students.dataset).unwrap();
    assert_eq!(reports.len(), n_models);
    for r in &reports {
        assert!(r.test_accuracy > 0.8, "{} scored {}", r.name, r.test_accuracy);
        assert_eq!(r.test_report.class_names, vec!["Low", "Middle", "High"]);
    }

    // report accuracy and the per-class supports agree with the summary row
    for r in &reports {
        assert_abs_diff_eq!(r.test_report.accuracy, r.test_accuracy, epsilon = 1e-12);
        let support: usize = r.test_report.classes.iter().map(|c| c.support).sum();
        assert_eq!(support, r.test_report.total_support);
    }

    let table = render_report_table(&reports);
    assert!(table.contains("Gaussian Naive Bayes"));
    assert_eq!(table.lines().count(), n_models + 2);
}

#[test]
fn test_demo_with_every_model() {
    let config = ExperimentConfig {
        scaler: ScalerKind::Standard,
        ..ExperimentConfig::default()
    };
    let dataset = make_classification(&config.synthetic, Some(config.seed)).unwrap();
    assert_eq!(dataset.n_samples(), 200);

    let reports = Experiment::new(config).run(&dataset).unwrap();
    assert_eq!(reports.len(), 7);
    let best = reports.iter().map(|r| r.test_accuracy).fold(0.0, f64::max);
    assert!(best > 0.7, "best test accuracy {best}");

    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 7);
    assert!(json[0]["test_report"]["accuracy"].is_number());
}

#[test]
fn test_config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.toml");
    fs::write(
        &path,
        r#"
seed = 3
test_ratio = 0.2
scaler = "none"

[synthetic]
n_samples = 100
n_classes = 3
n_features = 5
n_informative = 3

[[models]]
kind = "k_neighbors"
k = 5

[[models]]
kind = "gaussian_nb"
"#,
    )
    .unwrap();

    let config = load_config(Some(&path), dir.path()).unwrap();
    assert_eq!(config.models.len(), 2);
    let dataset = make_classification(&config.synthetic, Some(config.seed)).unwrap();
    assert_eq!(dataset.n_classes(), 3);

    let experiment = Experiment::new(config);
    let split = experiment.split(&dataset).unwrap();
    let mut model = experiment.pipeline(&experiment.config.models[1]).unwrap();
    model.fit(&split.x_train, &split.y_train).unwrap();
    let proba = model.predict_proba(&split.x_test).unwrap();
    for row in proba.rows().unwrap() {
        assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    let reports = experiment.run(&dataset).unwrap();
    assert_eq!(reports[0].kind, "k_neighbors");
    assert_eq!(reports[1].name, "Gaussian Naive Bayes");
}

#[test]
fn test_missing_students_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_students(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(WorkflowError::from(err), WorkflowError::Students(_)));
}
