/// Metadata about a pull request plus its per-file diffs.
/// Built from the GitHub API metadata response and the parsed raw diff;
/// never mutated after the fetch.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body; empty when the author left none
    pub description: String,
    /// Author's GitHub login
    pub author: String,
    /// Changed files, in the order the host reported them
    pub files: Vec<DiffFile>,
}

impl PullRequest {
    /// Total lines added across all files.
    pub fn additions(&self) -> usize {
        self.files.iter().map(|f| f.additions).sum()
    }

    /// Total lines removed across all files.
    pub fn deletions(&self) -> usize {
        self.files.iter().map(|f| f.deletions).sum()
    }
}

/// How a file was touched by the PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Removed => write!(f, "removed"),
            ChangeKind::Renamed => write!(f, "renamed"),
        }
    }
}

/// A single file within the PR diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    /// File path after the change (e.g., "src/auth/config.rs")
    pub path: String,
    pub change: ChangeKind,
    /// Lines added in this file
    pub additions: usize,
    /// Lines deleted in this file
    pub deletions: usize,
    /// Raw unified diff text for this file, starting at its `diff --git` header
    pub diff: String,
}

/// Represents the parsed components of a GitHub PR URL.
#[derive(Debug, Clone)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, additions: usize, deletions: usize) -> DiffFile {
        DiffFile {
            path: path.to_string(),
            change: ChangeKind::Modified,
            additions,
            deletions,
            diff: String::new(),
        }
    }

    #[test]
    fn test_line_totals_sum_files() {
        let pr = PullRequest {
            owner: "org".to_string(),
            repo: "repo".to_string(),
            number: 7,
            title: "Totals".to_string(),
            description: String::new(),
            author: "alice".to_string(),
            files: vec![file("a.rs", 3, 1), file("b.rs", 4, 0)],
        };
        assert_eq!(pr.additions(), 7);
        assert_eq!(pr.deletions(), 1);
    }

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!(ChangeKind::Renamed.to_string(), "renamed");
    }
}
