//! Pipeline for turning prompts and essays into budgeted training files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::budget::{truncate_response, BudgetConfig, Truncation, TruncationStatus};
use crate::document::{Pair, PairDocument, Split};
use crate::error::{Error, Result};
use crate::helpers::strip_prompt;
use crate::matcher::{match_slug, MatchPolicy, SlugMatch};
use crate::prompts::PromptEntry;
use crate::{
    Tokenizer, COMPLETION_SEPARATOR, CONTINUATION_TIER, LONG_CONTEXT_MAX_TOKENS,
    LONG_CONTEXT_ONLY_TIER, SHORT_CONTEXT_MAX_TOKENS,
};

/// Header of a derived short-context training document.
pub const SHORT_TRAIN_HEADER: &str = "# GPT-2 Training Pairs

Tiers 3-4 only. All responses must fit within GPT-2's 1,024 token context window (prompt + response combined). Truncate or exclude pairs that exceed this limit.

Tier reference:
- **3:** Opening → continuation essay or Note/Tweet
- **4:** Content extraction (neutral summary) → finished Note/Tweet";

/// Header of a derived short-context validation document.
pub const SHORT_VAL_HEADER: &str = "# GPT-2 Validation Pairs

Holdout pairs for evaluation. These are NOT used for training.
Val pairs must come from different essays than training pairs.";

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub short_max_tokens: usize,
    pub long_max_tokens: usize,
    /// Tiers left out of short-context documents.
    pub skip_tiers: Vec<u32>,
    /// File name suffix of cleaned essays.
    pub essay_suffix: String,
    pub match_policy: MatchPolicy,
    /// Fewer validation pairs than this triggers a warning.
    pub min_val_pairs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            short_max_tokens: SHORT_CONTEXT_MAX_TOKENS,
            long_max_tokens: LONG_CONTEXT_MAX_TOKENS,
            skip_tiers: vec![LONG_CONTEXT_ONLY_TIER],
            essay_suffix: "_clean.md".to_string(),
            match_policy: MatchPolicy::FirstMatch,
            min_val_pairs: 4,
        }
    }
}

/// Read a UTF-8 file, attaching the path to any error.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Discover all essay files under a directory, sorted by path.
pub fn discover_essays(root: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(|name| name.ends_with(suffix)))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

fn file_stem(path: &PathBuf) -> &str {
    path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("")
}

/// Restrict prompts to a single slug when one is requested.
pub fn select_prompts(prompts: Vec<PromptEntry>, slug: Option<&str>) -> Result<Vec<PromptEntry>> {
    let Some(slug) = slug else {
        return Ok(prompts);
    };
    prompts
        .into_iter()
        .find(|entry| entry.slug == slug)
        .map(|entry| vec![entry])
        .ok_or_else(|| Error::PromptNotFound(slug.to_string()))
}

/// Build the response for a prompt from its essay.
///
/// Continuation-tier prompts are the essay's opening, so the response is the
/// essay with the prompt stripped; every other tier uses the whole essay.
/// Returns `None` when a continuation prompt cannot be located in the essay.
pub fn build_response<'a>(tier: Option<u32>, prompt: &str, essay: &'a str) -> Option<&'a str> {
    if tier == Some(CONTINUATION_TIER) {
        strip_prompt(essay, prompt)
    } else {
        Some(essay)
    }
}

/// Pairs built from the prompts file, plus everything that went wrong.
#[derive(Debug, Clone, Default)]
pub struct FreshPairs {
    pub pairs: Vec<Pair>,
    /// Slugs with no (or, under the strict policy, no unique) essay.
    pub unresolved: Vec<String>,
    pub warnings: Vec<String>,
}

/// Build one fresh pair per prompt entry from the discovered essays.
///
/// Unresolved slugs and unlocated prompts are reported, never fatal. Entries
/// with empty prompt text are skipped. A continuation prompt that covers the
/// whole essay leaves no response, so its slug is reported as unresolved.
pub fn assemble_fresh_pairs(
    prompts: &[PromptEntry],
    essays: &[PathBuf],
    policy: MatchPolicy,
) -> Result<FreshPairs> {
    let mut fresh = FreshPairs::default();

    for entry in prompts.iter().filter(|entry| !entry.prompt.is_empty()) {
        let essay_path = match match_slug(&entry.slug, essays, file_stem, policy) {
            SlugMatch::Found(path) => path,
            SlugMatch::NotFound => {
                warn!(slug = %entry.slug, "no essay found");
                fresh.unresolved.push(entry.slug.clone());
                continue;
            }
            SlugMatch::Ambiguous(paths) => {
                let names: Vec<&str> = paths.iter().map(|p| file_stem(p)).collect();
                let message = format!("slug '{}' matches several essays: {}", entry.slug, names.join(", "));
                warn!("{}", message);
                fresh.warnings.push(message);
                fresh.unresolved.push(entry.slug.clone());
                continue;
            }
        };

        let essay = read_text(essay_path)?;
        let essay = essay.trim();
        let response = match build_response(entry.tier, &entry.prompt, essay) {
            Some(response) => response,
            None => {
                let message = format!("prompt not found in essay for {}", entry.slug);
                warn!("{}", message);
                fresh.warnings.push(message);
                essay
            }
        };
        if response.trim().is_empty() {
            let message = format!("prompt covers the whole essay for {}", entry.slug);
            warn!("{}", message);
            fresh.warnings.push(message);
            fresh.unresolved.push(entry.slug.clone());
            continue;
        }

        fresh
            .pairs
            .push(Pair::new(entry.slug.clone(), entry.tier, entry.prompt.clone(), response));
    }

    Ok(fresh)
}

/// A pair whose response has been fitted to the short-context budget.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetedPair {
    pub label: String,
    pub tier: Option<u32>,
    pub prompt_tokens: usize,
    pub truncation: Truncation,
}

/// Short-context pairs derived from a long-form document.
#[derive(Debug, Clone)]
pub struct DerivedPairs {
    pub pairs: Vec<BudgetedPair>,
    /// Labels left out because their tier is skipped.
    pub skipped: Vec<String>,
    /// Short-context copies, in document order, for pairs that kept any text.
    pub document: PairDocument,
    pub approximate: bool,
}

impl DerivedPairs {
    pub fn truncated_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.truncation.was_truncated()).count()
    }

    pub fn empty_labels(&self) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|p| p.truncation.status == TruncationStatus::Empty)
            .map(|p| p.label.as_str())
            .collect()
    }
}

/// Fit every pair of `source` into the short-context budget.
///
/// Pairs whose tier is in `skip_tiers` are left out. A pair whose response
/// truncates to nothing is reported but not written to the derived document.
pub fn derive_budgeted_pairs<T: Tokenizer>(
    source: &PairDocument,
    tokenizer: &T,
    budget: &BudgetConfig,
    skip_tiers: &[u32],
    header: &str,
) -> DerivedPairs {
    let mut derived = DerivedPairs {
        pairs: Vec::new(),
        skipped: Vec::new(),
        document: PairDocument::new(header),
        approximate: tokenizer.is_approximate(),
    };

    for pair in source.pairs() {
        if pair.tier.is_some_and(|tier| skip_tiers.contains(&tier)) {
            derived.skipped.push(pair.label.clone());
            continue;
        }

        let prompt_tokens = tokenizer.count_tokens(&pair.prompt);
        let truncation = truncate_response(tokenizer, &pair.response, prompt_tokens, budget);

        if truncation.text.is_empty() {
            warn!(label = %pair.label, prompt_tokens, "response truncated to nothing");
        } else {
            derived.document.push(Pair {
                response: truncation.text.clone(),
                ..pair.clone()
            });
        }

        derived.pairs.push(BudgetedPair {
            label: pair.label.clone(),
            tier: pair.tier,
            prompt_tokens,
            truncation,
        });
    }

    derived
}

/// Default output path for a derived document: `llama` becomes `gpt2`.
pub fn derived_output_path(input: &Path) -> Option<PathBuf> {
    let name = input.file_name()?.to_str()?;
    let renamed = name.replace("llama", "gpt2");
    if renamed == name {
        return None;
    }
    Some(input.with_file_name(renamed))
}

/// A chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-style example for the long-context regime.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRecord {
    pub messages: Vec<ChatMessage>,
}

impl ChatRecord {
    pub fn from_pair(pair: &Pair) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: "user".to_string(),
                    content: pair.prompt.clone(),
                },
                ChatMessage {
                    role: "assistant".to_string(),
                    content: pair.response.clone(),
                },
            ],
        }
    }
}

/// Completion-style example for the short-context regime.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRecord {
    pub text: String,
}

impl CompletionRecord {
    pub fn from_pair(pair: &Pair) -> Self {
        Self {
            text: format!("{}{}{}", pair.prompt, COMPLETION_SEPARATOR, pair.response),
        }
    }
}

/// Counts and paths of written JSONL files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JsonlSummary {
    pub long_train: usize,
    pub long_val: usize,
    pub short_train: usize,
    pub short_val: usize,
    /// Completion records left out for exceeding the short ceiling.
    pub short_skipped: usize,
    pub files: BTreeMap<String, PathBuf>,
    pub approximate: bool,
}

fn write_records<R: Serialize>(path: &Path, records: &[R]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(writer, "{}", line).map_err(|e| Error::io(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Write chat and completion JSONL files, split by each pair's `split`.
///
/// Completion records whose full text exceeds the short-context ceiling are
/// skipped and counted.
pub fn write_jsonl_output<T: Tokenizer>(
    pairs: &[Pair],
    output_dir: &Path,
    tokenizer: &T,
    config: &PipelineConfig,
) -> Result<JsonlSummary> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

    let mut summary = JsonlSummary {
        approximate: tokenizer.is_approximate(),
        ..Default::default()
    };
    let mut long_train = Vec::new();
    let mut long_val = Vec::new();
    let mut short_train = Vec::new();
    let mut short_val = Vec::new();

    for pair in pairs {
        let is_validation = pair.effective_split() == Split::Val;
        let chat = ChatRecord::from_pair(pair);
        let completion = CompletionRecord::from_pair(pair);
        let fits_short = tokenizer.count_tokens(&completion.text) <= config.short_max_tokens;

        if is_validation {
            long_val.push(chat);
        } else {
            long_train.push(chat);
        }

        if !fits_short {
            summary.short_skipped += 1;
        } else if is_validation {
            short_val.push(completion);
        } else {
            short_train.push(completion);
        }
    }

    let outputs = [
        ("llama_train", output_dir.join("llama_train.jsonl")),
        ("llama_val", output_dir.join("llama_val.jsonl")),
        ("gpt2_train", output_dir.join("gpt2_train.jsonl")),
        ("gpt2_val", output_dir.join("gpt2_val.jsonl")),
    ];
    write_records(&outputs[0].1, &long_train)?;
    write_records(&outputs[1].1, &long_val)?;
    write_records(&outputs[2].1, &short_train)?;
    write_records(&outputs[3].1, &short_val)?;

    summary.long_train = long_train.len();
    summary.long_val = long_val.len();
    summary.short_train = short_train.len();
    summary.short_val = short_val.len();
    summary.files = outputs
        .into_iter()
        .map(|(name, path)| (name.to_string(), path))
        .collect();

    info!(
        long = summary.long_train + summary.long_val,
        short = summary.short_train + summary.short_val,
        skipped = summary.short_skipped,
        "wrote JSONL output"
    );
    Ok(summary)
}

/// Token counts of one pair under both regimes.
#[derive(Debug, Clone, Serialize)]
pub struct PairTokenReport {
    pub label: String,
    pub tier: u32,
    pub split: Split,
    pub short_tokens: usize,
    pub long_tokens: usize,
    pub exceeds_short: bool,
    pub exceeds_long: bool,
}

/// Count every pair under the short (completion) and long (chat) regimes.
pub fn validate_pairs<S, L>(pairs: &[Pair], short: &S, long: &L, config: &PipelineConfig) -> Vec<PairTokenReport>
where
    S: Tokenizer,
    L: Tokenizer,
{
    pairs
        .iter()
        .map(|pair| {
            let short_tokens = short.count_tokens(&CompletionRecord::from_pair(pair).text);
            let long_tokens = long.count_tokens(&pair.prompt) + long.count_tokens(&pair.response);
            PairTokenReport {
                label: pair.label.clone(),
                tier: pair.tier_or_unspecified(),
                split: pair.effective_split(),
                short_tokens,
                long_tokens,
                exceeds_short: short_tokens > config.short_max_tokens,
                exceeds_long: long_tokens > config.long_max_tokens,
            }
        })
        .collect()
}

/// Tier and split distribution of a set of pairs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairStats {
    pub total: usize,
    pub train: usize,
    pub val: usize,
    /// Pair count per tier, `0` meaning unspecified.
    pub by_tier: BTreeMap<u32, usize>,
    pub warnings: Vec<String>,
}

pub fn pair_stats(pairs: &[Pair], config: &PipelineConfig) -> PairStats {
    let mut stats = PairStats {
        total: pairs.len(),
        ..Default::default()
    };
    for pair in pairs {
        match pair.effective_split() {
            Split::Train => stats.train += 1,
            Split::Val => stats.val += 1,
        }
        *stats.by_tier.entry(pair.tier_or_unspecified()).or_default() += 1;
    }
    if stats.val < config.min_val_pairs {
        stats.warnings.push(format!(
            "only {} validation pairs (recommend at least {})",
            stats.val, config.min_val_pairs
        ));
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;
    use crate::prompts::parse_prompts;
    use tempfile::TempDir;

    /// Counts whitespace-separated words.
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_discover_essays() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("nested")).unwrap();
        write(temp.path(), "b_essay_clean.md", "b");
        write(temp.path(), "a_essay_clean.md", "a");
        write(temp.path(), "notes.md", "skip");
        write(&temp.path().join("nested"), "c_clean.md", "c");

        let found = discover_essays(temp.path(), "_clean.md");
        let names: Vec<&str> = found.iter().map(|p| file_stem(p)).collect();
        assert_eq!(names, vec!["a_essay_clean", "b_essay_clean", "c_clean"]);
    }

    #[test]
    fn test_select_prompts() {
        let prompts = parse_prompts("## one\nP1\n## two\nP2\n");
        assert_eq!(select_prompts(prompts.clone(), None).unwrap().len(), 2);
        assert_eq!(select_prompts(prompts.clone(), Some("two")).unwrap()[0].prompt, "P2");
        assert!(matches!(
            select_prompts(prompts, Some("three")),
            Err(Error::PromptNotFound(slug)) if slug == "three"
        ));
    }

    #[test]
    fn test_build_response_by_tier() {
        let essay = "The opening.\n\nThe rest.";
        assert_eq!(build_response(Some(3), "The opening.", essay), Some("The rest."));
        assert_eq!(build_response(Some(4), "A summary.", essay), Some(essay));
        assert_eq!(build_response(None, "A summary.", essay), Some(essay));
        assert_eq!(build_response(Some(3), "Missing.", essay), None);
    }

    #[test]
    fn test_assemble_fresh_pairs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "15_the_9_11_ai_nft_clean.md", "The opening.\n\nThe continuation.\n");
        write(temp.path(), "02_summary_clean.md", "Whole essay.\n");
        write(temp.path(), "03_moved_clean.md", "Different opening.\n\nBody.\n");
        let essays = discover_essays(temp.path(), "_clean.md");

        let prompts = parse_prompts(
            "## 15-the-9-11-ai-nft\ntier: 3\nThe opening.\n\
## 02-summary\ntier: 4\nA neutral summary.\n\
## 03-moved\ntier: 3\nNot in the essay.\n\
## missing-essay\ntier: 3\nAnything.\n\
## pending\ntier: 3\n",
        );
        let fresh = assemble_fresh_pairs(&prompts, &essays, MatchPolicy::FirstMatch).unwrap();

        let labels: Vec<&str> = fresh.pairs.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["15-the-9-11-ai-nft", "02-summary", "03-moved"]);
        assert_eq!(fresh.pairs[0].response, "The continuation.");
        assert_eq!(fresh.pairs[1].response, "Whole essay.");
        assert_eq!(fresh.pairs[2].response, "Different opening.\n\nBody.");
        assert_eq!(fresh.unresolved, vec!["missing-essay"]);
        assert_eq!(fresh.warnings, vec!["prompt not found in essay for 03-moved"]);
    }

    #[test]
    fn test_assemble_rejects_prompt_covering_whole_essay() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "short_note_clean.md", "The whole note is the opening.
");
        write(temp.path(), "long_note_clean.md", "The opening.

A continuation.
");
        let essays = discover_essays(temp.path(), "_clean.md");
        let prompts = parse_prompts(
            "## short-note\ntier: 3\nThe whole note is the opening.\n\
## long-note\ntier: 3\nThe opening.\n",
        );

        let fresh = assemble_fresh_pairs(&prompts, &essays, MatchPolicy::FirstMatch).unwrap();
        let labels: Vec<&str> = fresh.pairs.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["long-note"]);
        assert!(fresh.pairs.iter().all(|p| !p.response.trim().is_empty()));
        assert_eq!(fresh.unresolved, vec!["short-note"]);
        assert_eq!(fresh.warnings, vec!["prompt covers the whole essay for short-note"]);
    }

    #[test]
    fn test_assemble_reports_ambiguity_under_strict_policy() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "ai_essay_clean.md", "One.");
        write(temp.path(), "ai_essay_part_2_clean.md", "Two.");
        let essays = discover_essays(temp.path(), "_clean.md");
        let prompts = parse_prompts("## ai-essay\ntier: 4\nSummary.\n");

        let strict = assemble_fresh_pairs(&prompts, &essays, MatchPolicy::RejectAmbiguous).unwrap();
        assert!(strict.pairs.is_empty());
        assert_eq!(strict.unresolved, vec!["ai-essay"]);
        assert_eq!(strict.warnings.len(), 1);

        let lenient = assemble_fresh_pairs(&prompts, &essays, MatchPolicy::FirstMatch).unwrap();
        assert_eq!(lenient.pairs[0].response, "One.");
    }

    #[test]
    fn test_derive_budgeted_pairs() {
        let source = parse_document(
            "## pair: draft\ntier: 1\n### prompt\nRough draft.\n### response\nFinished essay.\n---\n\
## pair: long\ntier: 3\n### prompt\none two\n### response\na b c\n\nd e f\n\ng h i\n---\n\
## pair: hopeless\ntier: 4\n### prompt\nw w w w w w w w w w w w\n### response\nx\n---\n",
        )
        .document;
        let budget = BudgetConfig {
            max_tokens: 10,
            separator_tokens: 1,
        };

        let derived = derive_budgeted_pairs(&source, &WordTokenizer, &budget, &[1], SHORT_TRAIN_HEADER);
        assert_eq!(derived.skipped, vec!["draft"]);
        assert_eq!(derived.pairs.len(), 2);
        assert_eq!(derived.pairs[0].prompt_tokens, 2);
        assert_eq!(derived.pairs[0].truncation.text, "a b c\n\nd e f");
        assert_eq!(derived.truncated_count(), 1);
        assert_eq!(derived.empty_labels(), vec!["hopeless"]);

        let kept: Vec<&str> = derived.document.pairs().map(|p| p.label.as_str()).collect();
        assert_eq!(kept, vec!["long"]);
        assert_eq!(derived.document.header, SHORT_TRAIN_HEADER);
    }

    #[test]
    fn test_derived_output_path() {
        assert_eq!(
            derived_output_path(Path::new("pairs/llama_val.md")),
            Some(PathBuf::from("pairs/gpt2_val.md"))
        );
        assert_eq!(derived_output_path(Path::new("pairs/train.md")), None);
    }

    #[test]
    fn test_write_jsonl_output() {
        let temp = TempDir::new().unwrap();
        let mut val = Pair::new("b", Some(4), "Prompt two.", "Response two.");
        val.split = Some(Split::Val);
        let pairs = vec![
            Pair::new("a", Some(3), "Prompt one.", "Response one."),
            val,
            Pair::new("c", Some(3), "Long prompt.", "word ".repeat(50)),
        ];
        let config = PipelineConfig {
            short_max_tokens: 20,
            ..Default::default()
        };

        let summary = write_jsonl_output(&pairs, temp.path(), &WordTokenizer, &config).unwrap();
        assert_eq!(summary.long_train, 2);
        assert_eq!(summary.long_val, 1);
        assert_eq!(summary.short_train, 1);
        assert_eq!(summary.short_val, 1);
        assert_eq!(summary.short_skipped, 1);

        let chat = std::fs::read_to_string(temp.path().join("llama_val.jsonl")).unwrap();
        let record: serde_json::Value = serde_json::from_str(chat.trim()).unwrap();
        assert_eq!(record["messages"][0]["role"], "user");
        assert_eq!(record["messages"][1]["content"], "Response two.");

        let completion = std::fs::read_to_string(temp.path().join("gpt2_train.jsonl")).unwrap();
        let record: serde_json::Value = serde_json::from_str(completion.trim()).unwrap();
        assert_eq!(record["text"], "Prompt one.\n\n---\n\nResponse one.");
    }

    #[test]
    fn test_validate_and_stats() {
        let mut val = Pair::new("b", None, "p", "r");
        val.split = Some(Split::Val);
        let pairs = vec![Pair::new("a", Some(3), "one two", "three four five"), val];
        let config = PipelineConfig {
            short_max_tokens: 5,
            long_max_tokens: 5,
            ..Default::default()
        };

        let reports = validate_pairs(&pairs, &WordTokenizer, &WordTokenizer, &config);
        // "one two\n\n---\n\nthree four five" is six words
        assert_eq!(reports[0].short_tokens, 6);
        assert!(reports[0].exceeds_short);
        assert_eq!(reports[0].long_tokens, 5);
        assert!(!reports[0].exceeds_long);
        assert_eq!(reports[1].tier, 0);

        let stats = pair_stats(&pairs, &config);
        assert_eq!((stats.total, stats.train, stats.val), (2, 1, 1));
        assert_eq!(stats.by_tier.get(&3), Some(&1));
        assert_eq!(stats.by_tier.get(&0), Some(&1));
        assert_eq!(stats.warnings.len(), 1);
    }
}
