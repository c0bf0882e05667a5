use crate::analysis::SectionResults;
use crate::chunk::ChunkPlan;

/// How much of the PR the model actually saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    pub files_total: usize,
    pub files_included: usize,
    /// Path of the one file that was cut short, if any
    pub truncated: Option<String>,
    pub tokens_used: usize,
    pub usable_budget: usize,
}

impl From<&ChunkPlan<'_>> for Coverage {
    fn from(plan: &ChunkPlan<'_>) -> Self {
        Coverage {
            files_total: plan.files_total(),
            files_included: plan.entries().len(),
            truncated: plan.truncated_file().map(|f| f.path.clone()),
            tokens_used: plan.total_tokens(),
            usable_budget: plan.usable_budget(),
        }
    }
}

impl Coverage {
    /// One-line description shared by the report and the comment.
    pub fn describe(&self) -> String {
        let mut line = format!(
            "Reviewed {} of {} changed files ({} of {} budgeted tokens).",
            self.files_included, self.files_total, self.tokens_used, self.usable_budget
        );
        if let Some(path) = &self.truncated {
            line.push_str(&format!(" `{path}` was truncated to fit."));
        }
        line
    }
}

/// The merged outcome of one PR analysis. Built once by
/// [`crate::report::assemble`] and only read afterwards.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub pr_title: String,
    pub author: String,
    pub files_changed: usize,
    pub additions: usize,
    pub deletions: usize,
    /// One entry per requested section, in report order
    pub sections: SectionResults,
    pub summary: String,
    /// Present only when the quality section succeeded with a score in 1..=10
    pub quality_score: Option<u8>,
    /// Strengths reported by the quality section
    pub strengths: Vec<String>,
    /// Recommendations from every successful section, deduplicated
    pub recommendations: Vec<String>,
    pub coverage: Coverage,
}

/// The two text forms of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    /// Full Markdown report
    pub report_text: String,
    /// Shorter form for posting on the PR
    pub review_comment_text: String,
}
