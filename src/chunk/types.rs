use serde::Deserialize;

use super::ChunkError;
use crate::pr::DiffFile;

/// Token budget for the diff content of one prompt.
///
/// `limit` is the model's context allowance; `overhead` is held back for
/// instructions and PR metadata. Sizes are estimated from character counts
/// at `chars_per_token` characters per token-equivalent unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBudget {
    pub limit: usize,
    pub overhead: usize,
    chars_per_token: usize,
}

impl ContentBudget {
    pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

    pub fn new(limit: usize, overhead: usize) -> Self {
        Self {
            limit,
            overhead,
            chars_per_token: Self::DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// A ratio of zero is clamped to one.
    pub fn with_chars_per_token(mut self, chars_per_token: usize) -> Self {
        self.chars_per_token = chars_per_token.max(1);
        self
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    /// `limit - overhead`; fails when nothing is left for content.
    pub fn usable(&self) -> Result<usize, ChunkError> {
        match self.limit.checked_sub(self.overhead) {
            Some(usable) if usable > 0 => Ok(usable),
            _ => Err(ChunkError::BudgetExceeded {
                limit: self.limit,
                overhead: self.overhead,
            }),
        }
    }

    /// Estimated size of `text` in token-equivalent units, rounded up.
    pub fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Order in which files compete for the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FileOrder {
    /// Smallest estimated diff first, so more distinct files fit.
    #[default]
    SmallestFirst,
    /// The order the host listed the files in.
    Original,
}

/// One file selected for the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEntry<'a> {
    pub file: &'a DiffFile,
    /// The whole diff, or a prefix of it when `truncated`
    pub text: &'a str,
    /// Estimated size of `text`
    pub tokens: usize,
    pub truncated: bool,
}

/// The files, in prompt order, that fit within one usable budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan<'a> {
    pub(super) entries: Vec<ChunkEntry<'a>>,
    pub(super) usable_budget: usize,
    pub(super) files_total: usize,
}

impl<'a> ChunkPlan<'a> {
    pub fn entries(&self) -> &[ChunkEntry<'a>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.entries.iter().map(|e| e.tokens).sum()
    }

    pub fn usable_budget(&self) -> usize {
        self.usable_budget
    }

    /// Number of changed files in the PR, whether or not they made it in.
    pub fn files_total(&self) -> usize {
        self.files_total
    }

    /// The single file cut short, if any. Only the last entry can be truncated.
    pub fn truncated_file(&self) -> Option<&'a DiffFile> {
        self.entries.last().filter(|e| e.truncated).map(|e| e.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_budget() {
        assert_eq!(ContentBudget::new(100, 20).usable().unwrap(), 80);
        assert!(ContentBudget::new(100, 100).usable().is_err());
        assert!(ContentBudget::new(10, 50).usable().is_err());
    }

    #[test]
    fn test_estimate_rounds_up_and_is_monotonic() {
        let budget = ContentBudget::new(10, 0);
        assert_eq!(budget.estimate(""), 0);
        assert_eq!(budget.estimate("a"), 1);
        assert_eq!(budget.estimate("abcd"), 1);
        assert_eq!(budget.estimate("abcde"), 2);
        let mut text = String::new();
        let mut last = 0;
        for _ in 0..50 {
            text.push('x');
            let size = budget.estimate(&text);
            assert!(size >= last);
            last = size;
        }
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        let budget = ContentBudget::new(10, 0).with_chars_per_token(1);
        assert_eq!(budget.estimate("héllo"), 5);
    }

    #[test]
    fn test_zero_chars_per_token_is_clamped() {
        let budget = ContentBudget::new(10, 0).with_chars_per_token(0);
        assert_eq!(budget.chars_per_token(), 1);
    }
}
