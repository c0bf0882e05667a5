pub mod types;

pub use types::{ChunkEntry, ChunkPlan, ContentBudget, FileOrder};

use thiserror::Error;
use tracing::debug;

use crate::pr::DiffFile;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("Content budget exhausted before any diff fits: limit {limit} leaves nothing after {overhead} reserved for the prompt")]
    BudgetExceeded { limit: usize, overhead: usize },
}

/// Select, order and trim file diffs so their estimated size fits `budget`.
///
/// Files are walked in `order` and included whole while they fit. The first
/// file that does not fit contributes a prefix that fills the remaining budget
/// exactly, marked `truncated`, and the walk stops there: a plan never holds
/// more than one truncated entry and it is always the last. A file that fits
/// exactly is included whole.
pub fn plan<'a>(
    files: &'a [DiffFile],
    budget: &ContentBudget,
    order: FileOrder,
) -> Result<ChunkPlan<'a>, ChunkError> {
    let usable = budget.usable()?;

    let mut sized: Vec<(&DiffFile, usize)> =
        files.iter().map(|f| (f, budget.estimate(&f.diff))).collect();
    if order == FileOrder::SmallestFirst {
        // Stable sort keeps host order among equal sizes.
        sized.sort_by_key(|&(_, size)| size);
    }

    let mut entries = Vec::new();
    let mut used = 0;
    for (file, size) in sized {
        let remaining = usable - used;
        if size <= remaining {
            used += size;
            entries.push(ChunkEntry {
                file,
                text: &file.diff,
                tokens: size,
                truncated: false,
            });
            continue;
        }

        if remaining > 0 {
            let text = char_prefix(&file.diff, remaining * budget.chars_per_token());
            entries.push(ChunkEntry {
                file,
                text,
                tokens: budget.estimate(text),
                truncated: true,
            });
        }
        debug!(path = %file.path, size, remaining, "budget reached, stopping");
        break;
    }

    let plan = ChunkPlan {
        entries,
        usable_budget: usable,
        files_total: files.len(),
    };
    debug!(
        included = plan.entries.len(),
        files = files.len(),
        tokens = plan.total_tokens(),
        usable,
        "chunk plan built"
    );
    Ok(plan)
}

/// The longest prefix of `text` holding at most `max_chars` characters.
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
