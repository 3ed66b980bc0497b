/// Per-disease report counts.
///
/// Turns the flat report list from `GET /reports` into one row per disease
/// label, for the CLI summary and the legend counts.

use std::collections::HashMap;

use crate::diseases;
use crate::model::Report;

#[derive(Debug, Clone, PartialEq)]
pub struct DiseaseCount {
    pub label: String,
    pub display_name: String,
    pub count: usize,
}

/// Counts reports per label, highest count first. Ties are ordered by label
/// so the output is stable.
///
/// Reports are counted regardless of their coordinates: a report the map
/// cannot plot is still an observation of the disease.
pub fn group_by_disease(reports: &[Report]) -> Vec<DiseaseCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for report in reports {
        *counts.entry(report.disease.as_str()).or_insert(0) += 1;
    }

    let mut rows: Vec<DiseaseCount> = counts
        .into_iter()
        .map(|(label, count)| DiseaseCount {
            label: label.to_string(),
            display_name: diseases::classify(label).display_name,
            count,
        })
        .collect();

    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReportId;

    fn report(id: i64, disease: &str) -> Report {
        Report {
            id: ReportId::Number(id),
            lat: 20.0,
            long: 78.0,
            disease: disease.to_string(),
        }
    }

    #[test]
    fn test_counts_ordered_by_frequency() {
        let reports = vec![
            report(1, "Tomato___healthy"),
            report(2, "Potato___Early_blight"),
            report(3, "Potato___Early_blight"),
            report(4, "Tomato___Late_blight"),
            report(5, "Potato___Early_blight"),
            report(6, "Tomato___healthy"),
        ];
        let rows = group_by_disease(&reports);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "Potato___Early_blight");
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[0].display_name, "Potato Early Blight");
        assert_eq!(rows[1].label, "Tomato___healthy");
        assert_eq!(rows[2].count, 1);
    }

    #[test]
    fn test_ties_break_on_label() {
        let rows = group_by_disease(&[report(1, "b"), report(2, "a")]);
        assert_eq!(rows[0].label, "a");
        assert_eq!(rows[1].label, "b");
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_disease(&[]).is_empty());
    }
}
