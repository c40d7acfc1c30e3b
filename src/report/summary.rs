#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use chrono::{DateTime, Local};
use itertools::Itertools;
use tabled::{Table, Tabled, settings::Style};

use crate::{
    config::Config,
    constants::TIMESTAMP_FORMAT,
    grade::{GradingResult, LetterGrade},
};

/// Aggregate statistics over a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    /// Number of results.
    pub total:             usize,
    /// Mean overall score, `0.0` for an empty set.
    pub average_score:     f64,
    /// Results carrying the integrity flag.
    pub integrity_alerts:  usize,
    /// Results needing manual review.
    pub manual_reviews:    usize,
    /// Threshold used for `passing`.
    pub passing_threshold: f64,
    /// Results at or above `passing_threshold`.
    pub passing:           usize,
    /// Count per grade for all thirteen grades, best first.
    pub distribution:      Vec<(LetterGrade, usize)>,
}

impl ClassSummary {
    /// Computes the statistics for `results`.
    pub fn from_results(results: &[GradingResult], passing_threshold: f64) -> Self {
        let total = results.len();
        let average_score = if total == 0 {
            0.0
        } else {
            results.iter().map(|r| r.overall_score).sum::<f64>() / total as f64
        };

        let counts = results.iter().counts_by(|r| r.letter_grade);
        let distribution = LetterGrade::ALL
            .into_iter()
            .map(|grade| (grade, counts.get(&grade).copied().unwrap_or(0)))
            .collect();

        Self {
            total,
            average_score,
            integrity_alerts: results.iter().filter(|r| r.integrity_flag).count(),
            manual_reviews: results.iter().filter(|r| r.requires_manual_review).count(),
            passing_threshold,
            passing: results.iter().filter(|r| r.passes(passing_threshold)).count(),
            distribution,
        }
    }

    /// `count` as a percentage of the class.
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

/// One row of the grade distribution table.
#[derive(Tabled)]
struct DistributionRow {
    /// Letter grade.
    #[tabled(rename = "Grade")]
    grade:      LetterGrade,
    /// Students with this grade.
    #[tabled(rename = "Count")]
    count:      usize,
    /// Share of the class.
    #[tabled(rename = "Percentage")]
    percentage: String,
}

/// Renders the class summary report.
pub fn render_summary(
    config: &Config,
    results: &[GradingResult],
    generated_at: DateTime<Local>,
) -> String {
    let stats = ClassSummary::from_results(results, config.grading.passing_threshold);

    let mut out = format!(
        "# Grading Summary: {}\n\nGenerated: {}\n\n## Overview\n\n",
        config.assignment.title,
        generated_at.format(TIMESTAMP_FORMAT)
    );
    out.push_str(&format!("- Total submissions: {}\n", stats.total));
    out.push_str(&format!("- Average score: {:.2}\n", stats.average_score));
    out.push_str(&format!(
        "- Passing threshold: {:.1} ({} of {} passed)\n",
        stats.passing_threshold, stats.passing, stats.total
    ));
    out.push_str(&format!("- Academic integrity alerts: {}\n", stats.integrity_alerts));
    out.push_str(&format!("- Manual reviews required: {}\n", stats.manual_reviews));

    let rows = stats
        .distribution
        .iter()
        .map(|&(grade, count)| DistributionRow {
            grade,
            count,
            percentage: format!("{:.1}%", stats.percentage(count)),
        })
        .collect::<Vec<_>>();
    out.push_str("\n## Grade Distribution\n\n");
    out.push_str(&Table::new(rows).with(Style::markdown()).to_string());
    out.push('\n');

    let flagged = results.iter().filter(|r| r.integrity_flag).collect::<Vec<_>>();
    if !flagged.is_empty() {
        out.push_str("\n## Flagged Submissions\n\n");
        for result in flagged {
            let (confidence, risk) = result
                .detection
                .as_ref()
                .map(|d| (format!("{:.3}", d.confidence), d.risk_level.to_string()))
                .unwrap_or_else(|| ("N/A".to_string(), "N/A".to_string()));
            out.push_str(&format!(
                "- {} ({}): confidence {confidence}, risk {risk}\n",
                result.student_name, result.student_id
            ));
        }
    }

    out
}

/// One row of the console results table.
#[derive(Tabled)]
struct ResultRow {
    /// Directory name.
    #[tabled(rename = "Student ID")]
    student_id: String,
    /// Parsed name.
    #[tabled(rename = "Name")]
    name:       String,
    /// Overall score.
    #[tabled(rename = "Score")]
    score:      String,
    /// Letter grade.
    #[tabled(rename = "Grade")]
    grade:      String,
    /// Detector verdict.
    #[tabled(rename = "AI Risk")]
    risk:       String,
    /// Needs an instructor.
    #[tabled(rename = "Review")]
    review:     String,
}

/// Renders results as a console table.
pub fn results_table(results: &[GradingResult]) -> String {
    let rows = results.iter().map(|r| ResultRow {
        student_id: r.student_id.clone(),
        name:       r.student_name.clone(),
        score:      format!("{:.1}", r.overall_score),
        grade:      r.letter_grade.to_string(),
        risk:       r
            .detection
            .as_ref()
            .map(|d| format!("{} ({:.2})", d.risk_level, d.confidence))
            .unwrap_or_else(|| "N/A".to_string()),
        review:     if r.requires_manual_review { "yes" } else { "" }.to_string(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}
