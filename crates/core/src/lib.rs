//! Core logic for building supervised fine-tuning pairs from long-form text.
//!
//! This crate parses `## pair:` documents into structured prompt/response
//! pairs, merges freshly built pairs into an existing document, and truncates
//! responses at paragraph boundaries so a serialized example fits a model's
//! context window.

/// Trait for tokenization operations.
///
/// Implementors only need to count tokens. For exact budgets use a real
/// tokenizer; for a rough estimate use [`CharApproxTokenizer`], which reports
/// itself as approximate so callers never present its counts as authoritative.
pub trait Tokenizer {
    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> usize;

    /// Whether counts are an estimate rather than the output of a real tokenizer.
    fn is_approximate(&self) -> bool {
        false
    }
}

// Blanket implementation for references to Tokenizers
impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn count_tokens(&self, text: &str) -> usize {
        (*self).count_tokens(text)
    }

    fn is_approximate(&self) -> bool {
        (*self).is_approximate()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }

    fn is_approximate(&self) -> bool {
        (**self).is_approximate()
    }
}

/// Character-based approximate tokenizer (~4 chars per token).
///
/// Degraded mode for when no real tokenizer is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharApproxTokenizer;

impl Tokenizer for CharApproxTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count() / APPROX_CHARS_PER_TOKEN
    }

    fn is_approximate(&self) -> bool {
        true
    }
}

mod budget;
mod document;
mod error;
mod helpers;
mod matcher;
mod merge;
pub mod pipeline;
mod prompts;

pub use budget::{
    analyze_paragraphs, find_cut_index, truncate_response, BudgetAnalysis, BudgetConfig,
    ParagraphRow, Truncation, TruncationStatus,
};
pub use document::{
    parse_document, render_appendix, render_document, render_pair, Block, BlockError,
    BlockErrorKind, Pair, PairDocument, ParsedDocument, Split,
};
pub use error::{Error, Result};
pub use helpers::{
    join_paragraphs, normalize_label, normalize_text, preview, segment_paragraphs, strip_prompt,
    NormalizedLength,
};
pub use matcher::{match_containing, match_slug, MatchPolicy, SlugMatch};
pub use merge::{merge_pairs, MergeMode, MergeReport, ResponseChange};
pub use pipeline::{
    assemble_fresh_pairs, build_response, derive_budgeted_pairs, derived_output_path,
    discover_essays, pair_stats, read_text, select_prompts, validate_pairs, write_jsonl_output,
    BudgetedPair, ChatMessage, ChatRecord, CompletionRecord, DerivedPairs, FreshPairs,
    JsonlSummary, PairStats, PairTokenReport, PipelineConfig, SHORT_TRAIN_HEADER, SHORT_VAL_HEADER,
};
pub use prompts::{parse_prompts, PromptEntry};

/// Context ceiling for the short-context regime (GPT-2).
pub const SHORT_CONTEXT_MAX_TOKENS: usize = 1024;

/// Context ceiling for the long-context regime (Llama).
pub const LONG_CONTEXT_MAX_TOKENS: usize = 2048;

/// Literal inserted between prompt and response in completion-style examples.
pub const COMPLETION_SEPARATOR: &str = "\n\n---\n\n";

/// Boundary between paragraphs.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Tokens reserved for the prompt when no prompt text is available.
pub const DEFAULT_PROMPT_BUDGET_TOKENS: usize = 80;

/// Tier whose response is the essay with the prompt (its opening) removed.
pub const CONTINUATION_TIER: u32 = 3;

/// Tier that only makes sense under the long-context regime.
pub const LONG_CONTEXT_ONLY_TIER: u32 = 1;

/// Characters per token assumed by [`CharApproxTokenizer`].
pub const APPROX_CHARS_PER_TOKEN: usize = 4;
