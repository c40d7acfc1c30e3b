#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeMap;

use crate::types::DetectionResult;

/// Everything the feedback text depends on.
pub struct FeedbackInput<'a> {
    /// Final weighted score.
    pub overall_score:        f64,
    /// Criterion scores after penalties.
    pub criteria_scores:      &'a BTreeMap<String, f64>,
    /// Detector verdict, if any.
    pub detection:            Option<&'a DetectionResult>,
    /// Whether the late penalty was applied.
    pub is_late:              bool,
    /// Configured late penalty in percent.
    pub late_penalty_percent: f64,
}

/// `code_quality` -> `Code Quality`.
pub fn criterion_title(criterion: &str) -> String {
    criterion
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Recommendation line for a score band.
fn recommendation(score: f64) -> &'static str {
    if score >= 90.0 {
        "- Excellent work! Continue practicing these skills."
    } else if score >= 80.0 {
        "- Good work! Focus on code quality and documentation."
    } else if score >= 70.0 {
        "- Passing grade. Review feedback and improve weak areas."
    } else {
        "- Below passing. Please review course materials and seek help."
    }
}

/// Builds the student-facing feedback text.
///
/// Output is a pure function of the input, so reruns produce identical
/// feedback files.
pub fn generate_feedback(input: &FeedbackInput<'_>) -> String {
    let mut lines = vec![
        format!("Overall Score: {:.1}/100", input.overall_score),
        String::new(),
        "Detailed Breakdown:".to_string(),
    ];

    for (criterion, score) in input.criteria_scores {
        lines.push(format!("- {}: {score:.1}/100", criterion_title(criterion)));
    }
    lines.push(String::new());

    let flagged = input.detection.is_some_and(|d| d.flagged);
    if let Some(detection) = input.detection {
        if detection.flagged {
            lines.push("⚠️ ACADEMIC INTEGRITY ALERT:".to_string());
            lines.push(format!(
                "AI-generated content detected (confidence: {:.3})",
                detection.confidence
            ));
            lines.push(format!("Risk level: {}", detection.risk_level));
            lines.push("This submission requires manual review and discussion.".to_string());
        } else {
            lines.push("✅ Academic integrity check passed".to_string());
        }
        lines.push(String::new());
    }

    if input.is_late {
        lines.push(format!(
            "⏰ Late submission penalty applied: -{}%",
            input.late_penalty_percent
        ));
        lines.push(String::new());
    }

    lines.push("Recommendations:".to_string());
    lines.push(recommendation(input.overall_score).to_string());
    if flagged {
        lines.push("- Schedule meeting to discuss academic integrity policies.".to_string());
        lines.push("- Complete assignment independently for full credit.".to_string());
    }

    lines.join("\n")
}
