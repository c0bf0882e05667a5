use super::types::{ChangeKind, DiffFile};
use super::PrError;

/// Split a unified diff into one `DiffFile` per `diff --git` section.
///
/// The raw text of each section is kept verbatim in `DiffFile::diff` so the
/// chunker can budget and truncate it. Change kind comes from the extended
/// header lines (`new file mode`, `deleted file mode`, `rename from`) with
/// `/dev/null` on either side as a fallback. Line counts skip the `---`/`+++`
/// file headers.
pub fn parse_diff(raw_diff: &str) -> Result<Vec<DiffFile>, PrError> {
    if raw_diff.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut current: Option<DiffFile> = None;
    let mut in_hunk = false;

    for line in raw_diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(done) = current.take() {
                files.push(done);
            }
            in_hunk = false;
            current = Some(DiffFile {
                path: header_path(rest)?,
                change: ChangeKind::Modified,
                additions: 0,
                deletions: 0,
                diff: String::new(),
            });
        }

        let Some(file) = current.as_mut() else {
            // Preamble before the first file header (e.g. a mail header) is not part of any file.
            continue;
        };
        file.diff.push_str(line);
        file.diff.push('\n');

        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }

        if !in_hunk {
            if line.starts_with("new file mode") || line == "--- /dev/null" {
                file.change = ChangeKind::Added;
            } else if line.starts_with("deleted file mode") || line == "+++ /dev/null" {
                file.change = ChangeKind::Removed;
            } else if line.starts_with("rename from ") || line.starts_with("similarity index") {
                file.change = ChangeKind::Renamed;
            } else if let Some(to) = line.strip_prefix("rename to ") {
                file.change = ChangeKind::Renamed;
                file.path = to.to_string();
            } else if let Some(old_path) = line.strip_prefix("--- a/") {
                file.path = file_header_path(old_path);
            } else if let Some(new_path) = line.strip_prefix("+++ b/") {
                file.path = file_header_path(new_path);
            }
            continue;
        }

        if line.starts_with('+') {
            file.additions += 1;
        } else if line.starts_with('-') {
            file.deletions += 1;
        }
    }

    if let Some(done) = current.take() {
        files.push(done);
    }
    Ok(files)
}

/// Path from the `diff --git a/X b/Y` line. When both sides name the same
/// file the halves are equal, which also covers paths containing spaces.
/// The `---`/`+++` and `rename to` lines refine it later when present.
fn header_path(rest: &str) -> Result<String, PrError> {
    if rest.starts_with("a/") && rest.len() > 5 {
        let half = (rest.len() - 5) / 2;
        let a_side = rest.get(2..2 + half);
        let b_side = rest.get(2 + half..);
        if let (Some(a_side), Some(b_side)) = (a_side, b_side) {
            if b_side.strip_prefix(" b/") == Some(a_side) {
                return Ok(a_side.to_string());
            }
        }
    }

    let mut parts = rest.split_whitespace();
    let a_path = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing a/ path in diff header".to_string()))?;
    let b_path = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing b/ path in diff header".to_string()))?;
    Ok(b_path
        .strip_prefix("b/")
        .or_else(|| a_path.strip_prefix("a/"))
        .unwrap_or(b_path)
        .to_string())
}

/// git appends a tab to `---`/`+++` names that contain spaces.
fn file_header_path(name: &str) -> String {
    name.trim_end_matches('\t').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_DIFF: &str = r#"diff --git a/src/main.rs b/src/main.rs
index abc1234..def5678 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,5 +1,7 @@
 fn main() {
-    println!("old");
+    println!("new");
+    // Added a comment
 }
"#;

    #[test]
    fn test_parse_single_file_diff() {
        let files = parse_diff(SAMPLE_DIFF).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/main.rs");
        assert_eq!(files[0].change, ChangeKind::Modified);
        assert_eq!(files[0].additions, 2);
        assert_eq!(files[0].deletions, 1);
        assert_eq!(files[0].diff, SAMPLE_DIFF);
    }

    #[test]
    fn test_parse_new_file_diff() {
        let diff = r#"diff --git a/new_file.txt b/new_file.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new_file.txt
@@ -0,0 +1,2 @@
+hello
+world
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].change, ChangeKind::Added);
        assert_eq!(files[0].additions, 2);
    }

    #[test]
    fn test_parse_deleted_file_diff() {
        let diff = r#"diff --git a/old_file.txt b/old_file.txt
deleted file mode 100644
index e69de29..0000000
--- a/old_file.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-hello
-world
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].change, ChangeKind::Removed);
        assert_eq!(files[0].deletions, 2);
    }

    #[test]
    fn test_parse_renamed_file_diff() {
        let diff = r#"diff --git a/old/name.rs b/new/name.rs
similarity index 100%
rename from old/name.rs
rename to new/name.rs
"#;
        let files = parse_diff(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].change, ChangeKind::Renamed);
        assert_eq!(files[0].path, "new/name.rs");
        assert_eq!(files[0].additions, 0);
    }

    #[test]
    fn test_parse_multiple_files_keeps_order_and_text() {
        let diff = format!(
            "{SAMPLE_DIFF}diff --git a/README.md b/README.md\n--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-old\n+new\n"
        );
        let files = parse_diff(&diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/main.rs");
        assert_eq!(files[1].path, "README.md");
        assert!(files[1].diff.starts_with("diff --git a/README.md"));
        assert!(!files[0].diff.contains("README"));
    }

    #[test]
    fn test_removed_line_starting_with_dashes_counts_inside_hunk() {
        let diff = "diff --git a/a.sql b/a.sql\n--- a/a.sql\n+++ b/a.sql\n@@ -1,1 +0,0 @@\n--- a comment\n";
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].deletions, 1);
        assert_eq!(files[0].change, ChangeKind::Modified);
    }

    #[test]
    fn test_path_with_spaces() {
        let diff = "diff --git a/docs/my file.md b/docs/my file.md\n--- a/docs/my file.md\t\n+++ b/docs/my file.md\t\n@@ -1 +1 @@\n-old\n+new\n";
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].path, "docs/my file.md");
        assert_eq!(files[0].additions, 1);
    }

    #[test]
    fn test_path_with_spaces_without_file_headers() {
        let diff = "diff --git a/my file.sh b/my file.sh\nold mode 100644\nnew mode 100755\n";
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].path, "my file.sh");
        assert_eq!(files[0].change, ChangeKind::Modified);
    }

    #[test]
    fn test_deleted_file_keeps_old_path() {
        let diff = "diff --git a/old notes.txt b/old notes.txt\ndeleted file mode 100644\n--- a/old notes.txt\t\n+++ /dev/null\n@@ -1 +0,0 @@\n-bye\n";
        let files = parse_diff(diff).unwrap();
        assert_eq!(files[0].path, "old notes.txt");
        assert_eq!(files[0].change, ChangeKind::Removed);
    }

    #[test]
    fn test_parse_empty_diff() {
        let files = parse_diff("").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_malformed_header_is_error() {
        assert!(parse_diff("diff --git a/only\n").is_err());
    }
}
