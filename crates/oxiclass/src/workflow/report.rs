//! Plain-text renderings of label counts and model accuracy.

use oxiclass_datasets::{ClassCount, Dataset};

use super::experiment::ModelReport;

/// Longest bar of a count plot, in characters.
pub const PLOT_WIDTH: usize = 40;

/// Samples per class, in class order.
pub fn label_distribution(dataset: &Dataset) -> Vec<ClassCount> {
    dataset.class_counts()
}

/// Horizontal bar chart of class counts (the "count plot").
///
/// ```text
/// Low    | ##########             127
/// Middle | ##################### 211
/// ```
pub fn render_count_plot(counts: &[ClassCount]) -> String {
    let label_width = counts.iter().map(|c| c.class.len()).max().unwrap_or(0);
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0);
    let mut out = String::new();
    for c in counts {
        let bar = if max == 0 {
            0
        } else {
            // round to nearest, but never hide a non-empty class
            ((c.count * PLOT_WIDTH + max / 2) / max).max(usize::from(c.count > 0))
        };
        out.push_str(&format!(
            "{:<lw$} | {:<pw$} {}\n",
            c.class,
            "#".repeat(bar),
            c.count,
            lw = label_width,
            pw = PLOT_WIDTH
        ));
    }
    out
}

/// Accuracy summary, one row per model.
pub fn render_report_table(reports: &[ModelReport]) -> String {
    let name_width = reports
        .iter()
        .map(|r| r.name.len())
        .chain(["model".len()])
        .max()
        .unwrap_or(0);
    let mut out = format!(
        "{:<nw$}  {:>9}  {:>9}  {:>10}\n",
        "model",
        "train acc",
        "test acc",
        "fit (ms)",
        nw = name_width
    );
    out.push_str(&"-".repeat(name_width + 36));
    out.push('\n');
    for r in reports {
        out.push_str(&format!(
            "{:<nw$}  {:>9.3}  {:>9.3}  {:>10.1}\n",
            r.name,
            r.train_accuracy,
            r.test_accuracy,
            r.fit_time_ms,
            nw = name_width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiclass_core::Tensor;
    use oxiclass_metrics::classification_report;

    #[test]
    fn test_count_plot_scales_bars() {
        let counts = vec![
            ClassCount { class: "Low".into(), count: 10 },
            ClassCount { class: "Middle".into(), count: 40 },
            ClassCount { class: "High".into(), count: 0 },
        ];
        let plot = render_count_plot(&counts);
        let lines: Vec<&str> = plot.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].matches('#').count(), PLOT_WIDTH);
        assert_eq!(lines[0].matches('#').count(), PLOT_WIDTH / 4);
        assert_eq!(lines[2].matches('#').count(), 0);
        assert!(lines[0].starts_with("Low    | "));
        assert!(lines[1].ends_with(" 40"));
    }

    #[test]
    fn test_tiny_class_still_visible() {
        let counts = vec![
            ClassCount { class: "a".into(), count: 1000 },
            ClassCount { class: "b".into(), count: 1 },
        ];
        let plot = render_count_plot(&counts);
        assert_eq!(plot.lines().nth(1).unwrap().matches('#').count(), 1);
    }

    #[test]
    fn test_report_table_layout() {
        let names = vec!["a".to_string(), "b".to_string()];
        let report = classification_report(&[0, 1, 1], &[0, 1, 0], &names).unwrap();
        let reports = vec![ModelReport {
            name: "Decision Tree".into(),
            kind: "decision_tree".into(),
            train_accuracy: 1.0,
            test_accuracy: report.accuracy,
            fit_time_ms: 2.25,
            test_report: report,
        }];
        let table = render_report_table(&reports);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("model"));
        assert_eq!(lines[1], "-".repeat("Decision Tree".len() + 36));
        assert!(lines[2].starts_with("Decision Tree"));
        assert!(lines[2].contains("1.000"));
        assert!(lines[2].contains("0.667"));
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn test_label_distribution() {
        let ds = Dataset::with_default_names(Tensor::zeros(vec![3, 1]), vec![1, 1, 0], 2).unwrap();
        let counts: Vec<usize> = label_distribution(&ds).iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![1, 2]);
    }
}
