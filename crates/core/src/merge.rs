//! Reconcile freshly built pairs with an existing pair document.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::document::{Block, Pair, PairDocument};
use crate::helpers::normalize_label;
use crate::CONTINUATION_TIER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Add pairs whose label is new; leave existing pairs alone.
    #[default]
    Append,
    /// Also refresh the responses of existing continuation-tier pairs.
    Regenerate,
}

/// A stored response replaced during regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseChange {
    pub label: String,
    pub old_len: usize,
    pub new_len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub added: Vec<Pair>,
    pub updated: Vec<ResponseChange>,
    pub unchanged: usize,
}

impl MergeReport {
    /// True when the merge left the document as it was.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Normalized label of any block, including ones that failed to parse.
fn block_label(block: &Block) -> Option<String> {
    match block {
        Block::Pair(pair) => Some(pair.normalized_label()),
        Block::Malformed(raw) => raw
            .lines()
            .next()
            .and_then(|heading| heading.strip_prefix("## pair:"))
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(normalize_label),
    }
}

fn is_complete(pair: &Pair) -> bool {
    !pair.prompt.trim().is_empty() && !pair.response.trim().is_empty()
}

/// Merge `fresh` into `document`, keyed by normalized label.
///
/// In [`MergeMode::Regenerate`] an existing pair of tier 3 gets the fresh
/// response when the byte lengths differ; pairs of any other tier are never
/// rewritten. In both modes fresh pairs with unseen labels are appended in
/// the order given. A fresh pair with an empty prompt or response is never
/// merged, so a stored response is never replaced by nothing. Running the
/// same merge twice changes nothing the second time.
pub fn merge_pairs(document: &mut PairDocument, fresh: &[Pair], mode: MergeMode) -> MergeReport {
    let mut report = MergeReport::default();
    let fresh: Vec<&Pair> = fresh.iter().filter(|pair| is_complete(pair)).collect();

    if mode == MergeMode::Regenerate {
        let fresh_by_label: HashMap<String, &Pair> =
            fresh.iter().map(|pair| (pair.normalized_label(), *pair)).collect();

        for existing in document.pairs_mut() {
            let replacement = fresh_by_label
                .get(&existing.normalized_label())
                .filter(|_| existing.tier == Some(CONTINUATION_TIER));
            match replacement {
                Some(new) if new.response.len() != existing.response.len() => {
                    report.updated.push(ResponseChange {
                        label: existing.label.clone(),
                        old_len: existing.response.len(),
                        new_len: new.response.len(),
                    });
                    existing.response = new.response.clone();
                }
                _ => report.unchanged += 1,
            }
        }
    } else {
        report.unchanged = document.pairs().count();
    }

    let mut known: HashSet<String> = document.blocks.iter().filter_map(block_label).collect();
    for pair in fresh {
        if known.insert(pair.normalized_label()) {
            document.push(pair.clone());
            report.added.push(pair.clone());
        }
    }

    report
}
