//! Token-budgeted truncation at paragraph boundaries.
//!
//! Subword tokenization is not additive across concatenation: the token
//! count of `a + "\n\n" + b` can differ from the sum of the parts. The
//! truncator therefore estimates a cut point from per-paragraph counts and
//! then verifies the joined candidate against the real tokenizer, backing off
//! one paragraph at a time until it fits.

use serde::Serialize;
use tracing::{debug, warn};

use crate::helpers::{join_paragraphs, preview, segment_paragraphs};
use crate::{Tokenizer, COMPLETION_SEPARATOR, PARAGRAPH_SEPARATOR};

/// Token ceiling for one serialized (prompt, separator, response) example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetConfig {
    /// Hard ceiling for the whole example.
    pub max_tokens: usize,
    /// Token cost of [`COMPLETION_SEPARATOR`] under the active tokenizer.
    pub separator_tokens: usize,
}

impl BudgetConfig {
    /// Build a config whose separator cost is measured with `tokenizer`.
    pub fn new<T: Tokenizer>(tokenizer: &T, max_tokens: usize) -> Self {
        Self {
            max_tokens,
            separator_tokens: tokenizer.count_tokens(COMPLETION_SEPARATOR),
        }
    }

    /// Budget left for the response; negative when the prompt alone is too large.
    pub fn signed_budget(&self, prompt_tokens: usize) -> i64 {
        self.max_tokens as i64 - prompt_tokens as i64 - self.separator_tokens as i64
    }

    /// Budget left for the response, or `None` when nothing fits.
    pub fn response_budget(&self, prompt_tokens: usize) -> Option<usize> {
        self.max_tokens
            .checked_sub(prompt_tokens)?
            .checked_sub(self.separator_tokens)
            .filter(|budget| *budget > 0)
    }
}

/// Outcome of fitting a response into its budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TruncationStatus {
    /// The whole response fits.
    Fits,
    /// A proper paragraph prefix was kept.
    Truncated { percent_removed: f64 },
    /// Nothing fits: either the prompt exhausts the window or the first
    /// paragraph alone exceeds the budget.
    Empty,
}

/// A response reduced to its budget.
#[derive(Debug, Clone, Serialize)]
pub struct Truncation {
    pub text: String,
    pub tokens: usize,
    pub original_tokens: usize,
    pub budget: i64,
    pub status: TruncationStatus,
}

impl Truncation {
    fn empty(original_tokens: usize, budget: i64) -> Self {
        Self {
            text: String::new(),
            tokens: 0,
            original_tokens,
            budget,
            status: TruncationStatus::Empty,
        }
    }

    /// True when a proper paragraph prefix was kept.
    pub fn was_truncated(&self) -> bool {
        matches!(self.status, TruncationStatus::Truncated { .. })
    }
}

/// Return the paragraph index where the running estimate first exceeds `budget`.
///
/// The running count includes one paragraph separator before every paragraph
/// after the first. Returns `None` when the estimate never exceeds the budget.
pub fn find_cut_index<T: Tokenizer>(tokenizer: &T, paragraphs: &[&str], budget: usize) -> Option<usize> {
    let separator_tokens = tokenizer.count_tokens(PARAGRAPH_SEPARATOR);
    let mut running = 0;
    for (i, paragraph) in paragraphs.iter().enumerate() {
        if i > 0 {
            running += separator_tokens;
        }
        running += tokenizer.count_tokens(paragraph);
        if running > budget {
            return Some(i);
        }
    }
    None
}

/// Truncate `response` at a paragraph boundary so that the example fits.
///
/// The result is either the response unchanged or the literal join of a
/// contiguous paragraph prefix whose true token count is within budget. An
/// empty result is the degenerate case, never an error.
pub fn truncate_response<T: Tokenizer>(
    tokenizer: &T,
    response: &str,
    prompt_tokens: usize,
    config: &BudgetConfig,
) -> Truncation {
    let original_tokens = if response.is_empty() {
        0
    } else {
        tokenizer.count_tokens(response)
    };
    let signed_budget = config.signed_budget(prompt_tokens);

    let Some(budget) = config.response_budget(prompt_tokens) else {
        warn!(prompt_tokens, budget = signed_budget, "prompt alone exceeds the context window");
        return Truncation::empty(original_tokens, signed_budget);
    };

    if original_tokens <= budget {
        return Truncation {
            text: response.to_string(),
            tokens: original_tokens,
            original_tokens,
            budget: signed_budget,
            status: TruncationStatus::Fits,
        };
    }

    let paragraphs = segment_paragraphs(response);
    let mut cut = find_cut_index(tokenizer, &paragraphs, budget).unwrap_or(paragraphs.len());
    debug!(estimate = cut, paragraphs = paragraphs.len(), budget, "estimated cut point");

    while cut > 0 {
        let candidate = join_paragraphs(&paragraphs[..cut]);
        let tokens = tokenizer.count_tokens(&candidate);
        if tokens <= budget {
            let removed = original_tokens - tokens;
            return Truncation {
                text: candidate,
                tokens,
                original_tokens,
                budget: signed_budget,
                status: TruncationStatus::Truncated {
                    percent_removed: removed as f64 / original_tokens as f64 * 100.0,
                },
            };
        }
        debug!(cut, tokens, budget, "joined candidate over budget, backing off");
        cut -= 1;
    }

    Truncation::empty(original_tokens, signed_budget)
}

/// One paragraph in a [`BudgetAnalysis`].
#[derive(Debug, Clone, Serialize)]
pub struct ParagraphRow {
    /// 1-based paragraph number.
    pub number: usize,
    pub tokens: usize,
    /// Running total including separators.
    pub running: usize,
    pub preview: String,
}

/// Paragraph-by-paragraph view of where the budget runs out.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetAnalysis {
    pub prompt_tokens: usize,
    pub separator_tokens: usize,
    pub budget: i64,
    pub rows: Vec<ParagraphRow>,
    /// Number of the first paragraph that crosses the budget.
    pub cutoff: Option<usize>,
    /// Running total before the cutoff paragraph.
    pub clean_cut_tokens: usize,
    /// Running total over all paragraphs.
    pub total_tokens: usize,
    pub approximate: bool,
}

impl BudgetAnalysis {
    pub fn excluded_tokens(&self) -> usize {
        self.total_tokens.saturating_sub(self.clean_cut_tokens)
    }
}

/// Per-paragraph token counts with the cutoff marked.
pub fn analyze_paragraphs<T: Tokenizer>(
    tokenizer: &T,
    text: &str,
    prompt_tokens: usize,
    config: &BudgetConfig,
) -> BudgetAnalysis {
    let budget = config.signed_budget(prompt_tokens);
    let separator_tokens = tokenizer.count_tokens(PARAGRAPH_SEPARATOR);

    let mut rows = Vec::new();
    let mut running = 0usize;
    let mut cutoff = None;
    let mut clean_cut_tokens = 0;

    for (i, paragraph) in segment_paragraphs(text).into_iter().enumerate() {
        let tokens = tokenizer.count_tokens(paragraph);
        let before = running;
        if i > 0 {
            running += separator_tokens;
        }
        running += tokens;

        if cutoff.is_none() && running as i64 > budget {
            cutoff = Some(i + 1);
            clean_cut_tokens = before;
        }

        rows.push(ParagraphRow {
            number: i + 1,
            tokens,
            running,
            preview: preview(paragraph, 70),
        });
    }

    BudgetAnalysis {
        prompt_tokens,
        separator_tokens: config.separator_tokens,
        budget,
        rows,
        cutoff,
        clean_cut_tokens: if cutoff.is_some() { clean_cut_tokens } else { running },
        total_tokens: running,
        approximate: tokenizer.is_approximate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Counts whitespace-separated words; additive across paragraph joins.
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    /// One token per visible char plus two per paragraph separator.
    struct CharCostTokenizer;

    impl Tokenizer for CharCostTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            let visible = text.chars().filter(|c| !c.is_whitespace()).count();
            visible + 2 * text.matches("\n\n").count()
        }
    }

    /// Joins cost extra tokens that the separator alone does not, so the
    /// per-paragraph estimate undercounts.
    struct JoinPenaltyTokenizer;

    impl Tokenizer for JoinPenaltyTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            if text.trim().is_empty() {
                return 0;
            }
            text.split_whitespace().count() + 5 * text.matches("\n\n").count()
        }
    }

    fn config(max_tokens: usize, separator_tokens: usize) -> BudgetConfig {
        BudgetConfig {
            max_tokens,
            separator_tokens,
        }
    }

    #[test]
    fn test_three_paragraph_cut() {
        let response = format!("{}\n\n{}\n\n{}", "a".repeat(500), "b".repeat(400), "c".repeat(300));
        let cfg = config(1024, 4);
        assert_eq!(cfg.response_budget(50), Some(970));

        let paragraphs = segment_paragraphs(&response);
        assert_eq!(find_cut_index(&CharCostTokenizer, &paragraphs, 970), Some(2));

        let result = truncate_response(&CharCostTokenizer, &response, 50, &cfg);
        assert_eq!(result.text, format!("{}\n\n{}", "a".repeat(500), "b".repeat(400)));
        assert_eq!(result.tokens, 902);
        assert_eq!(result.original_tokens, 1204);
        assert!(matches!(result.status, TruncationStatus::Truncated { .. }));
        assert!(result.was_truncated());
    }

    #[test]
    fn test_first_paragraph_over_small_budget_is_empty() {
        let response = format!("{}\n\n{}", "a".repeat(30), "b".repeat(10));
        let result = truncate_response(&CharCostTokenizer, &response, 1000, &config(1024, 4));
        assert_eq!(result.budget, 20);
        assert_eq!(result.text, "");
        assert_eq!(result.status, TruncationStatus::Empty);
    }

    #[test]
    fn test_prompt_exhausts_window() {
        let result = truncate_response(&WordTokenizer, "one two", 1020, &config(1024, 4));
        assert_eq!(result.text, "");
        assert_eq!(result.budget, 0);
        assert_eq!(result.status, TruncationStatus::Empty);

        let result = truncate_response(&WordTokenizer, "one two", 2000, &config(1024, 4));
        assert_eq!(result.budget, -980);
        assert_eq!(result.original_tokens, 2);
    }

    #[test]
    fn test_fitting_response_is_unchanged() {
        let response = "one two\n\nthree four\n";
        let result = truncate_response(&WordTokenizer, response, 0, &config(10, 0));
        assert_eq!(result.text, response);
        assert_eq!(result.status, TruncationStatus::Fits);
        assert!(!result.was_truncated());
    }

    #[test]
    fn test_verification_backs_off_when_joins_cost_more() {
        let response = "a b c\n\nd e f\n\ng h i";
        let paragraphs = segment_paragraphs(response);
        // The additive estimate (3, 6, 9) never crosses 10 ...
        assert_eq!(find_cut_index(&JoinPenaltyTokenizer, &paragraphs, 10), None);

        // ... but the joined text does (19, then 11), so only one paragraph survives.
        let result = truncate_response(&JoinPenaltyTokenizer, response, 0, &config(10, 0));
        assert_eq!(result.text, "a b c");
        assert_eq!(result.tokens, 3);
    }

    #[test]
    fn test_analyze_marks_cutoff() {
        let text = "one two three\n\nfour five\n\nsix seven eight nine";
        let analysis = analyze_paragraphs(&WordTokenizer, text, 2, &config(10, 1));
        assert_eq!(analysis.budget, 7);
        let running: Vec<usize> = analysis.rows.iter().map(|r| r.running).collect();
        assert_eq!(running, vec![3, 5, 9]);
        assert_eq!(analysis.cutoff, Some(3));
        assert_eq!(analysis.clean_cut_tokens, 5);
        assert_eq!(analysis.excluded_tokens(), 4);
        assert!(!analysis.approximate);
    }

    #[test]
    fn test_analyze_without_cutoff() {
        let analysis = analyze_paragraphs(&WordTokenizer, "one\n\ntwo", 0, &config(100, 0));
        assert_eq!(analysis.cutoff, None);
        assert_eq!(analysis.total_tokens, 2);
        assert_eq!(analysis.excluded_tokens(), 0);
    }

    #[test]
    fn test_budget_config_measures_separator() {
        let cfg = BudgetConfig::new(&CharCostTokenizer, 1024);
        // "---" plus two paragraph breaks
        assert_eq!(cfg.separator_tokens, 7);
    }

    fn paragraphs_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::collection::vec("[a-z]{1,6}", 1..12).prop_map(|words| words.join(" ")),
            1..8,
        )
        .prop_map(|paragraphs| paragraphs.join("\n\n"))
    }

    proptest! {
        #[test]
        fn result_fits_and_is_paragraph_prefix(response in paragraphs_strategy(), budget in 1usize..60) {
            let result = truncate_response(&JoinPenaltyTokenizer, &response, 0, &config(budget, 0));
            prop_assert!(JoinPenaltyTokenizer.count_tokens(&result.text) <= budget);

            if !result.text.is_empty() {
                let paragraphs = segment_paragraphs(&response);
                let kept = segment_paragraphs(&result.text);
                prop_assert!(kept.len() <= paragraphs.len());
                prop_assert_eq!(&paragraphs[..kept.len()], &kept[..]);
            }
        }

        #[test]
        fn larger_budget_never_keeps_less(response in paragraphs_strategy(), low in 1usize..40, extra in 0usize..40) {
            let small = truncate_response(&WordTokenizer, &response, 0, &config(low, 0));
            let large = truncate_response(&WordTokenizer, &response, 0, &config(low + extra, 0));
            prop_assert!(small.tokens <= large.tokens);
        }

        #[test]
        fn fitting_response_is_returned_verbatim(response in paragraphs_strategy()) {
            let budget = WordTokenizer.count_tokens(&response).max(1);
            let result = truncate_response(&WordTokenizer, &response, 0, &config(budget, 0));
            prop_assert_eq!(result.text, response);
        }
    }
}
