pub mod types;

pub use types::{AnalysisReport, Coverage, RenderedReport};

use std::fmt::Write as _;
use std::path::Path;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::analysis::{SectionFailure, SectionKind, SectionResult, SectionResults};
use crate::pr::PullRequest;

/// Findings per section shown in the review comment.
const COMMENT_FINDINGS_PER_SECTION: usize = 3;
const COMMENT_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Merge section results with PR metadata into one report.
///
/// The summary comes from the quality section when it succeeded, otherwise
/// from the first successful section in report order. Recommendations from
/// all successful sections are merged in report order without duplicates.
pub fn assemble(pr: &PullRequest, coverage: Coverage, sections: SectionResults) -> AnalysisReport {
    let succeeded: Vec<_> = sections.values().filter_map(SectionResult::content).collect();

    let quality = sections
        .get(&SectionKind::Quality)
        .and_then(SectionResult::content);

    let summary = quality
        .and_then(|q| q.summary.clone())
        .or_else(|| succeeded.iter().find_map(|s| s.summary.clone()))
        .unwrap_or_else(|| {
            if succeeded.is_empty() {
                "No analysis section completed.".to_string()
            } else {
                "Analysis completed without a summary.".to_string()
            }
        });

    let mut recommendations: Vec<String> = Vec::new();
    for rec in succeeded.iter().flat_map(|s| &s.recommendations) {
        if !recommendations.contains(rec) {
            recommendations.push(rec.clone());
        }
    }

    AnalysisReport {
        owner: pr.owner.clone(),
        repo: pr.repo.clone(),
        pr_number: pr.number,
        pr_title: pr.title.clone(),
        author: pr.author.clone(),
        files_changed: pr.files.len(),
        additions: pr.additions(),
        deletions: pr.deletions(),
        quality_score: quality.and_then(|q| q.score()),
        strengths: quality.map(|q| q.strengths.clone()).unwrap_or_default(),
        summary,
        recommendations,
        coverage,
        sections,
    }
}

/// Render the full Markdown report and the shorter review comment.
pub fn render(report: &AnalysisReport) -> RenderedReport {
    RenderedReport {
        report_text: render_report(report),
        review_comment_text: render_comment(report),
    }
}

fn unavailable(failure: &SectionFailure) -> String {
    format!("analysis unavailable: {failure}")
}

fn render_report(report: &AnalysisReport) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# PR Review Analysis Report\n");
    let _ = writeln!(md, "## PR #{}: \"{}\"\n", report.pr_number, report.pr_title);
    let _ = writeln!(
        md,
        "**Repository:** {}/{} | **Author:** {} | **Files changed:** {} | **+{} -{}**\n",
        report.owner,
        report.repo,
        report.author,
        report.files_changed,
        report.additions,
        report.deletions
    );

    let _ = writeln!(md, "## Summary\n\n{}\n", report.summary);
    if let Some(score) = report.quality_score {
        let _ = writeln!(md, "## Code Quality Score: {score}/10\n");
    }
    if !report.strengths.is_empty() {
        let _ = writeln!(md, "## Best Practices\n");
        for strength in &report.strengths {
            let _ = writeln!(md, "- {strength}");
        }
        md.push('\n');
    }

    for (kind, result) in &report.sections {
        let _ = writeln!(md, "## {}\n", kind.title());
        match result {
            SectionResult::Content(findings) if findings.findings.is_empty() => {
                md.push_str("No findings.\n\n");
            }
            SectionResult::Content(findings) => {
                for finding in &findings.findings {
                    let _ = writeln!(md, "- {finding}");
                }
                md.push('\n');
            }
            SectionResult::Failure(failure) => {
                let _ = writeln!(md, "_{}_\n", unavailable(failure));
            }
        }
    }

    let _ = writeln!(md, "## Recommendations\n");
    if report.recommendations.is_empty() {
        md.push_str("No recommendations.\n\n");
    } else {
        for rec in &report.recommendations {
            let _ = writeln!(md, "- {rec}");
        }
        md.push('\n');
    }

    let _ = writeln!(md, "## Coverage\n\n{}", report.coverage.describe());
    md
}

fn render_comment(report: &AnalysisReport) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "### Automated review of #{}\n", report.pr_number);
    if let Some(score) = report.quality_score {
        let _ = writeln!(md, "**Code quality score:** {score}/10\n");
    }
    let _ = writeln!(md, "{}\n", report.summary);

    for (kind, result) in &report.sections {
        let _ = writeln!(md, "**{}**", kind.title());
        match result {
            SectionResult::Content(findings) if findings.findings.is_empty() => {
                md.push_str("- No findings.\n");
            }
            SectionResult::Content(findings) => {
                for finding in findings.findings.iter().take(COMMENT_FINDINGS_PER_SECTION) {
                    let _ = writeln!(md, "- {finding}");
                }
                let rest = findings
                    .findings
                    .len()
                    .saturating_sub(COMMENT_FINDINGS_PER_SECTION);
                if rest > 0 {
                    let _ = writeln!(md, "- ...and {rest} more in the full report");
                }
            }
            SectionResult::Failure(failure) => {
                let _ = writeln!(md, "- _{}_", unavailable(failure));
            }
        }
        md.push('\n');
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(md, "**Recommendations**");
        for rec in report.recommendations.iter().take(COMMENT_RECOMMENDATIONS) {
            let _ = writeln!(md, "- {rec}");
        }
        md.push('\n');
    }

    let _ = writeln!(md, "<sub>{}</sub>", report.coverage.describe());
    md
}

/// Output the rendered report to the terminal (default) or to a markdown file.
///
/// The file gets the full report followed by the review comment.
#[instrument(skip(report, rendered), fields(pr = report.pr_number))]
pub fn output(
    report: &AnalysisReport,
    rendered: &RenderedReport,
    output_path: Option<&Path>,
) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report, rendered);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(rendered, path)
        }
    }
}

fn print_terminal_report(report: &AnalysisReport, rendered: &RenderedReport) {
    println!();
    println!("PR #{}: \"{}\"", report.pr_number, report.pr_title);
    println!(
        "Author: {} | Files changed: {} | +{} -{}",
        report.author, report.files_changed, report.additions, report.deletions
    );
    println!();

    println!("═══ Summary ═══");
    println!("{}", report.summary);
    match report.quality_score {
        Some(score) => println!("Quality score: {}", colorize_score(score)),
        None => println!("Quality score: {}", "n/a".dimmed()),
    }
    println!();

    if !report.strengths.is_empty() {
        println!("═══ Best Practices ═══");
        for strength in &report.strengths {
            println!("  • {strength}");
        }
        println!();
    }

    for (kind, result) in &report.sections {
        println!("═══ {} ═══", kind.title());
        match result {
            SectionResult::Content(findings) if findings.findings.is_empty() => {
                println!("  No findings.");
            }
            SectionResult::Content(findings) => {
                for finding in &findings.findings {
                    println!("  • {finding}");
                }
            }
            SectionResult::Failure(failure) => {
                println!("  {}", unavailable(failure).red().bold());
            }
        }
        println!();
    }

    println!("═══ Recommendations ═══");
    if report.recommendations.is_empty() {
        println!("  No recommendations.");
    }
    for rec in &report.recommendations {
        println!("  • {rec}");
    }
    println!();
    println!("{}", report.coverage.describe().dimmed());
    println!();

    println!("═══ Review Comment ═══");
    println!("{}", rendered.review_comment_text);
}

fn write_markdown_report(rendered: &RenderedReport, path: &Path) -> Result<(), ReportError> {
    let contents = format!(
        "{}\n## Generated Review Comment\n\n{}",
        rendered.report_text, rendered.review_comment_text
    );
    std::fs::write(path, contents)?;
    Ok(())
}

fn colorize_score(score: u8) -> colored::ColoredString {
    let text = format!("{score}/10");
    match score {
        8..=10 => text.green().bold(),
        5..=7 => text.yellow().bold(),
        _ => text.red().bold(),
    }
}
