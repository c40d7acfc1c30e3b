#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use chrono::{DateTime, Local};

use crate::{config::Config, constants::TIMESTAMP_FORMAT, grade::GradingResult};

/// Renders the integrity report, or `None` when nobody was flagged.
pub fn render_integrity(
    config: &Config,
    results: &[GradingResult],
    generated_at: DateTime<Local>,
) -> Option<String> {
    let flagged: Vec<&GradingResult> = results.iter().filter(|r| r.integrity_flag).collect();
    if flagged.is_empty() {
        return None;
    }

    let mut out = format!(
        "# Academic Integrity Report: {}\n\nGenerated: {}\n\nFlagged submissions: {}\n",
        config.assignment.title,
        generated_at.format(TIMESTAMP_FORMAT),
        flagged.len()
    );

    for result in flagged {
        out.push_str(&format!(
            "\n## {} ({})\n\n",
            result.student_name, result.student_id
        ));
        match &result.detection {
            Some(d) => {
                out.push_str(&format!("- AI confidence: {:.3}\n", d.confidence));
                out.push_str(&format!("- Risk level: {}\n", d.risk_level));
                out.push_str(&format!(
                    "- Patterns detected: {} ({} high confidence)\n",
                    d.pattern_count, d.high_confidence_pattern_count
                ));
            }
            None => out.push_str("- AI confidence: N/A\n- Risk level: N/A\n"),
        }
        out.push_str(&format!(
            "- Grade impact: {} ({:.1}/100)\n",
            result.letter_grade, result.overall_score
        ));
        out.push_str("- Action required: Manual review and student meeting\n");
    }

    Some(out)
}
