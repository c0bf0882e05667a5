pub mod llm;
pub mod parse;
pub mod prompt;
pub mod types;

pub use llm::LlmClient;
pub use prompt::SectionPrompt;
pub use types::{FailureKind, SectionFailure, SectionFindings, SectionKind, SectionResult, SectionResults};

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::chunk::ChunkPlan;
use crate::pr::PullRequest;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(
        "rate limited by the analysis backend{}",
        .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default()
    )]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("analysis backend unavailable: {0}")]
    Unavailable(String),

    #[error("analysis backend rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("analysis backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Section failure kind this error is reported as.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            BackendError::InvalidResponse(_) => FailureKind::MalformedResponse,
            BackendError::RateLimited { .. }
            | BackendError::Unavailable(_)
            | BackendError::Rejected { .. } => FailureKind::BackendUnavailable,
        }
    }
}

/// The model behind the review. One call per section.
/// Must be Send + Sync so sections can be polled concurrently.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one section prompt and return the raw text answer.
    async fn complete(&self, prompt: &SectionPrompt) -> Result<String, BackendError>;
}

/// Per-run settings for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Wall-clock limit for each section, applied independently
    pub section_timeout: Duration,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            section_timeout: Duration::from_secs(90),
        }
    }
}

/// Run every requested section against the planned diff, concurrently.
///
/// Sections share only immutable inputs. Each one ends in exactly one
/// `SectionResult`: content, or a failure that stays local to that section.
/// Cancelling `cancel` resolves every section still in flight to
/// `FailureKind::Cancelled`. The returned map always has one entry per
/// requested kind.
pub async fn run(
    pr: &PullRequest,
    plan: &ChunkPlan<'_>,
    sections: &BTreeSet<SectionKind>,
    backend: &dyn Backend,
    options: &AnalysisOptions,
    cancel: &CancellationToken,
) -> SectionResults {
    let tasks = sections.iter().map(|&kind| {
        let prompt = prompt::build(pr, plan, kind);
        async move {
            let result = run_section(&prompt, backend, options.section_timeout, cancel).await;
            (kind, result)
        }
        .instrument(info_span!("section", section = %kind))
    });

    let results: SectionResults = futures::future::join_all(tasks).await.into_iter().collect();
    for (kind, result) in &results {
        match result {
            SectionResult::Content(findings) => {
                debug!(section = %kind, findings = findings.findings.len(), "section complete")
            }
            SectionResult::Failure(failure) => {
                warn!(section = %kind, kind = %failure.kind, reason = %failure.message, "section failed")
            }
        }
    }
    results
}

async fn run_section(
    prompt: &SectionPrompt,
    backend: &dyn Backend,
    timeout: Duration,
    cancel: &CancellationToken,
) -> SectionResult {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return SectionResult::failure(FailureKind::Cancelled, "run cancelled before the section finished");
        }
        outcome = tokio::time::timeout(timeout, backend.complete(prompt)) => outcome,
    };

    let raw = match outcome {
        Err(_) => {
            return SectionResult::failure(
                FailureKind::BackendUnavailable,
                format!("no response within {}s", timeout.as_secs_f32()),
            );
        }
        Ok(Err(e)) => return SectionResult::failure(e.failure_kind(), e.to_string()),
        Ok(Ok(raw)) => raw,
    };

    match parse::parse_findings(&raw) {
        Ok(findings) => SectionResult::Content(findings),
        Err(e) => SectionResult::failure(
            FailureKind::MalformedResponse,
            format!("{e} ({} bytes received)", raw.len()),
        ),
    }
}
