#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use chrono::{DateTime, Local};

use crate::{constants::TIMESTAMP_FORMAT, grade::GradingResult};

/// `<student_id>_feedback.md`
pub fn feedback_file_name(student_id: &str) -> String {
    format!("{student_id}_feedback.md")
}

/// Renders one student's feedback file.
pub fn render_feedback(result: &GradingResult, generated_at: DateTime<Local>) -> String {
    let mut out = format!(
        "# Feedback for {} ({})\n\n## Grade: {} ({:.1}/100)\n\n",
        result.student_name, result.student_id, result.letter_grade, result.overall_score
    );

    if result.integrity_flag {
        out.push_str(
            "> ⚠️ This submission has been flagged for academic integrity review.\n\n",
        );
    }

    out.push_str(&result.feedback);
    out.push_str(&format!(
        "\n\n---\nGenerated: {}\n",
        generated_at.format(TIMESTAMP_FORMAT)
    ));
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::grade::LetterGrade;

    #[test]
    fn flagged_feedback_carries_banner_and_timestamp() {
        let result = GradingResult::builder()
            .student_id("s1_doe_jane")
            .student_name("doe jane")
            .overall_score(40.0)
            .letter_grade(LetterGrade::F)
            .feedback("Overall Score: 40.0/100")
            .integrity_flag(true)
            .requires_manual_review(true)
            .build();
        let at = Local
            .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
            .single()
            .expect("valid local time");

        let text = render_feedback(&result, at);
        assert!(text.starts_with("# Feedback for doe jane (s1_doe_jane)\n"));
        assert!(text.contains("## Grade: F (40.0/100)"));
        assert!(text.contains("flagged for academic integrity review"));
        assert!(text.contains("Overall Score: 40.0/100"));
        assert!(text.ends_with("Generated: 2026-03-01 09:30:00\n"));
    }

    #[test]
    fn file_name_uses_student_id() {
        assert_eq!(feedback_file_name("alice"), "alice_feedback.md");
    }
}
