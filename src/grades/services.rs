use std::collections::BTreeMap;

use super::dto::SubjectAverage;
use super::repo_types::SubjectValue;
use crate::error::{AppError, AppResult};
use crate::stats::{round2, Average};

pub fn required(field: &str, value: &str) -> AppResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

/// Letter grades and other free text carry no numeric value.
pub fn numeric_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Per-subject means, alphabetical by subject, plus the mean of every
/// numeric grade.
pub fn summarize(rows: &[SubjectValue]) -> (Vec<SubjectAverage>, Option<f64>) {
    let mut by_subject: BTreeMap<&str, (Average, u32)> = BTreeMap::new();
    let mut overall = Average::default();

    for row in rows {
        let (avg, ungraded) = by_subject.entry(row.subject.as_str()).or_default();
        match numeric_value(&row.value) {
            Some(v) => {
                avg.push(v);
                overall.push(v);
            }
            None => *ungraded += 1,
        }
    }

    let subjects = by_subject
        .into_iter()
        .map(|(subject, (avg, ungraded))| SubjectAverage {
            subject: subject.to_string(),
            average: avg.mean().map(round2),
            graded: avg.count,
            ungraded,
        })
        .collect();
    (subjects, overall.mean().map(round2))
}
