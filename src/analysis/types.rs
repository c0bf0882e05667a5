use std::collections::BTreeMap;

use serde::Deserialize;

/// One independent dimension of the review, produced by one model call.
///
/// Variant order is the report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Quality,
    Issues,
    Security,
    Performance,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Quality,
        SectionKind::Issues,
        SectionKind::Security,
        SectionKind::Performance,
    ];

    /// Heading used in rendered output.
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Quality => "Code Quality",
            SectionKind::Issues => "Potential Issues",
            SectionKind::Security => "Security Concerns",
            SectionKind::Performance => "Performance Insights",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionKind::Quality => write!(f, "quality"),
            SectionKind::Issues => write!(f, "issues"),
            SectionKind::Security => write!(f, "security"),
            SectionKind::Performance => write!(f, "performance"),
        }
    }
}

/// Structured content of a successful section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionFindings {
    pub summary: Option<String>,
    pub findings: Vec<String>,
    /// What the change does well
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
    /// Score exactly as the model wrote it; see [`SectionFindings::score`]
    pub raw_score: Option<String>,
}

impl SectionFindings {
    /// The score as an integer in 1..=10. Accepts `7`, `"7"` and `"7/10"`;
    /// anything else is treated as no score.
    pub fn score(&self) -> Option<u8> {
        let raw = self.raw_score.as_deref()?;
        let head = raw.split('/').next()?.trim();
        head.parse::<u8>().ok().filter(|s| (1..=10).contains(s))
    }
}

/// Why a section produced no content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend answered but the answer could not be parsed.
    MalformedResponse,
    /// Rate limit, timeout, network or server failure. Retrying the whole run may help.
    BackendUnavailable,
    /// The run was cancelled while this section was in flight.
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::BackendUnavailable => write!(f, "backend unavailable"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for SectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionResult {
    Content(SectionFindings),
    Failure(SectionFailure),
}

impl SectionResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        SectionResult::Failure(SectionFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn content(&self) -> Option<&SectionFindings> {
        match self {
            SectionResult::Content(findings) => Some(findings),
            SectionResult::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SectionResult::Failure(_))
    }
}

/// Exactly one result per requested section, iterated in report order.
pub type SectionResults = BTreeMap<SectionKind, SectionResult>;
