#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::grade::GradingResult;

/// Leading columns; one column per criterion of the first result follows.
const FIXED_COLUMNS: [&str; 9] = [
    "student_id",
    "student_name",
    "overall_score",
    "grade_letter",
    "ai_detected",
    "ai_confidence",
    "ai_risk_level",
    "requires_manual_review",
    "academic_integrity_flag",
];

/// Quotes a field when it contains a delimiter, quote or line break.
pub fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Renders the gradebook export.
///
/// Criterion columns are taken from the first result. Rows missing one of
/// those criteria leave the cell empty, and results without a detection
/// verdict read as `false`, `0.000`, `N/A`.
pub fn render_csv(results: &[GradingResult]) -> String {
    let criteria: Vec<&str> = results
        .first()
        .map(|r| r.criteria_scores.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let header = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(criteria.iter().copied())
        .map(escape)
        .collect::<Vec<_>>()
        .join(",");

    let mut out = String::new();
    out.push_str(&header);
    out.push('\n');

    for result in results {
        let (detected, confidence, risk) = match &result.detection {
            Some(d) => (
                d.flagged.to_string(),
                format!("{:.3}", d.confidence),
                d.risk_level.to_string(),
            ),
            None => ("false".to_string(), "0.000".to_string(), "N/A".to_string()),
        };

        let mut row = vec![
            escape(&result.student_id),
            escape(&result.student_name),
            format!("{:.2}", result.overall_score),
            result.letter_grade.to_string(),
            detected,
            confidence,
            risk,
            result.requires_manual_review.to_string(),
            result.integrity_flag.to_string(),
        ];
        row.extend(criteria.iter().map(|criterion| {
            result
                .criteria_scores
                .get(*criterion)
                .map(|score| format!("{score:.2}"))
                .unwrap_or_default()
        }));

        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
