//! CLI tool for building token-budgeted prompt/response pairs.
//!
//! Essays are paired with prompts from a prompts file, merged into a
//! long-context `## pair:` document, truncated at paragraph boundaries into a
//! short-context (GPT-2) copy, and exported as JSONL for fine-tuning.

mod tokenizer;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pair_budget_core::{
    analyze_paragraphs, assemble_fresh_pairs, build_response, derive_budgeted_pairs,
    derived_output_path, discover_essays, match_containing, merge_pairs, pair_stats,
    parse_document, parse_prompts, preview, read_text, render_appendix, render_document, select_prompts,
    truncate_response, validate_pairs, write_jsonl_output, BlockError, BudgetAnalysis,
    BudgetConfig, Error, MatchPolicy, MergeMode, Pair, PipelineConfig, PromptEntry, SlugMatch, Tokenizer,
    TruncationStatus, CONTINUATION_TIER, DEFAULT_PROMPT_BUDGET_TOKENS, LONG_CONTEXT_MAX_TOKENS,
    SHORT_CONTEXT_MAX_TOKENS, SHORT_TRAIN_HEADER, SHORT_VAL_HEADER,
};

use crate::tokenizer::TokenizerSpec;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Build, budget and export prompt/response pairs.
#[derive(Parser, Debug)]
#[command(name = "pair-budget")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tokenizer for the short-context regime: gpt2, cl100k, approx or hf:<name>
    #[arg(long, global = true, default_value = "gpt2")]
    tokenizer: TokenizerSpec,

    /// Require slugs to match exactly one candidate
    #[arg(long, global = true)]
    strict_slugs: bool,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show per-paragraph token counts and where the cut would fall
    Analyze(EssayArgs),

    /// Print essays truncated to the response budget
    Cut(EssayArgs),

    /// Pair essays with prompts and merge them into a long-context document
    BuildPairs(BuildPairsArgs),

    /// Derive a short-context document by truncating every response
    TruncatePairs(TruncatePairsArgs),

    /// Validate a pairs document and write chat/completion JSONL
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct EssayArgs {
    /// Essay file(s) or directories of .md files
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Context ceiling for prompt, separator and response together
    #[arg(long, default_value_t = SHORT_CONTEXT_MAX_TOKENS)]
    max_tokens: usize,

    /// Tokens reserved for the prompt when no prompt text is given
    #[arg(long, default_value_t = DEFAULT_PROMPT_BUDGET_TOKENS)]
    prompt_tokens: usize,

    /// Prompt text to count instead of --prompt-tokens
    #[arg(long, conflicts_with = "prompts")]
    prompt: Option<String>,

    /// Prompts file; each essay uses the prompt whose slug its name contains
    #[arg(long)]
    prompts: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BuildPairsArgs {
    /// Prompts file with `## slug` sections
    #[arg(long)]
    prompts: PathBuf,

    /// Directory searched recursively for cleaned essays
    #[arg(long)]
    essays: PathBuf,

    /// Long-context pairs document to update
    #[arg(long)]
    target: PathBuf,

    /// Only process this slug
    #[arg(long)]
    slug: Option<String>,

    /// Rewrite the document, refreshing continuation-tier responses
    #[arg(long)]
    regenerate: bool,

    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,

    /// File name suffix identifying cleaned essays
    #[arg(long, default_value = "_clean.md")]
    essay_suffix: String,
}

#[derive(Args, Debug)]
struct TruncatePairsArgs {
    /// Long-context pairs document
    input: PathBuf,

    /// Output path (default: input name with 'llama' replaced by 'gpt2')
    #[arg(long)]
    output: Option<PathBuf>,

    /// Context ceiling for the derived pairs
    #[arg(long, default_value_t = SHORT_CONTEXT_MAX_TOKENS)]
    max_tokens: usize,

    /// Tiers left out of the derived document
    #[arg(long = "skip-tier", default_values_t = vec![1u32])]
    skip_tiers: Vec<u32>,

    /// Report without writing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Pairs document to export
    pairs: PathBuf,

    /// Output directory for JSONL files
    #[arg(long, default_value = "jsonl")]
    output_dir: PathBuf,

    /// Tokenizer for the long-context regime
    #[arg(long, default_value = "cl100k")]
    long_tokenizer: TokenizerSpec,

    /// Context ceiling for completion records
    #[arg(long, default_value_t = SHORT_CONTEXT_MAX_TOKENS)]
    short_max_tokens: usize,

    /// Context ceiling for chat records
    #[arg(long, default_value_t = LONG_CONTEXT_MAX_TOKENS)]
    long_max_tokens: usize,

    /// Validate token counts without writing
    #[arg(long)]
    validate_only: bool,

    /// Print tier and split statistics without writing
    #[arg(long)]
    stats: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let policy = if cli.strict_slugs {
        MatchPolicy::RejectAmbiguous
    } else {
        MatchPolicy::FirstMatch
    };

    match cli.command {
        Command::Analyze(args) => {
            let tokenizer = load_tokenizer(&cli.tokenizer)?;
            run_analyze(&args, &tokenizer, policy)
        }
        Command::Cut(args) => {
            let tokenizer = load_tokenizer(&cli.tokenizer)?;
            run_cut(&args, &tokenizer, policy)
        }
        Command::BuildPairs(args) => run_build_pairs(&args, policy),
        Command::TruncatePairs(args) => {
            let tokenizer = load_tokenizer(&cli.tokenizer)?;
            run_truncate_pairs(&args, &tokenizer)
        }
        Command::Export(args) => run_export(&args, &cli.tokenizer),
    }
}

fn load_tokenizer(spec: &TokenizerSpec) -> CliResult<Box<dyn Tokenizer>> {
    info!(tokenizer = %spec, "loading tokenizer");
    let tokenizer = tokenizer::load(spec)?;
    if tokenizer.is_approximate() {
        warn!("token counts are approximate (chars / 4), not exact");
    }
    Ok(tokenizer)
}

// ---------------------------------------------------------------------------
// analyze / cut
// ---------------------------------------------------------------------------

/// One essay ready for budgeting.
struct EssayJob {
    path: PathBuf,
    /// Matched prompt entry, when a prompts file was used.
    entry: Option<PromptEntry>,
    /// Response text: the essay, minus its opening for continuation prompts.
    text: String,
    prompt_tokens: usize,
}

impl EssayJob {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn tier(&self) -> Option<u32> {
        self.entry.as_ref().and_then(|entry| entry.tier)
    }

    fn tier_label(&self) -> String {
        self.tier().map(|tier| format!("T{}", tier)).unwrap_or_else(|| "T?".to_string())
    }
}

fn collect_essay_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(discover_essays(path, ".md"));
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            warn!(path = %path.display(), "not found, skipping");
        }
    }
    files
}

fn prompt_slug(entry: &PromptEntry) -> &str {
    &entry.slug
}

/// Pick the prompt entry for an essay, or say why it is skipped.
fn resolve_essay_prompt<'a>(stem: &str, entries: &'a [PromptEntry], policy: MatchPolicy) -> Result<&'a PromptEntry, String> {
    match match_containing(stem, entries, prompt_slug, policy) {
        SlugMatch::Found(entry) if entry.prompt.is_empty() => Err(format!("{} (empty prompt)", stem)),
        SlugMatch::Found(entry) => Ok(entry),
        SlugMatch::NotFound => Err(format!("{} (no matching prompt)", stem)),
        SlugMatch::Ambiguous(candidates) => {
            let slugs: Vec<&str> = candidates.iter().map(|entry| entry.slug.as_str()).collect();
            warn!(essay = stem, slugs = %slugs.join(", "), "several prompts match");
            Err(format!("{} (ambiguous: matches {})", stem, slugs.join(", ")))
        }
    }
}

fn plan_essay_jobs<T: Tokenizer>(args: &EssayArgs, tokenizer: &T, policy: MatchPolicy) -> CliResult<Vec<EssayJob>> {
    let files = collect_essay_paths(&args.paths);
    if files.is_empty() {
        return Err("no essay files found".into());
    }

    let Some(prompts_path) = &args.prompts else {
        let prompt_tokens = match &args.prompt {
            Some(prompt) => tokenizer.count_tokens(prompt),
            None => args.prompt_tokens,
        };
        let mut jobs = Vec::with_capacity(files.len());
        for path in files {
            let text = read_text(&path)?.trim().to_string();
            jobs.push(EssayJob {
                path,
                entry: None,
                text,
                prompt_tokens,
            });
        }
        return Ok(jobs);
    };

    let entries = parse_prompts(&read_text(prompts_path)?);
    if entries.is_empty() {
        return Err(Error::NoPrompts(prompts_path.clone()).into());
    }

    let mut jobs = Vec::new();
    let mut skipped = Vec::new();
    for path in files {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let entry = match resolve_essay_prompt(&stem, &entries, policy) {
            Ok(entry) => entry,
            Err(reason) => {
                skipped.push(reason);
                continue;
            }
        };

        let essay = read_text(&path)?;
        let essay = essay.trim();
        let text = match build_response(entry.tier, &entry.prompt, essay) {
            Some(response) => response,
            None => {
                warn!(slug = %entry.slug, "prompt not found in essay, using the whole essay");
                essay
            }
        };
        jobs.push(EssayJob {
            prompt_tokens: tokenizer.count_tokens(&entry.prompt),
            text: text.to_string(),
            entry: Some(entry.clone()),
            path,
        });
    }

    if !skipped.is_empty() {
        eprintln!("Skipped {} files:", skipped.len());
        for name in &skipped {
            eprintln!("  {}", name);
        }
    }
    if jobs.is_empty() {
        return Err("no files matched any prompt slug".into());
    }
    Ok(jobs)
}

fn run_analyze<T: Tokenizer>(args: &EssayArgs, tokenizer: &T, policy: MatchPolicy) -> CliResult<()> {
    let budget = BudgetConfig::new(tokenizer, args.max_tokens);
    for job in plan_essay_jobs(args, tokenizer, policy)? {
        let total = tokenizer.count_tokens(&job.text);
        let scope = if job.tier() == Some(CONTINUATION_TIER) {
            "continuation only"
        } else {
            "total"
        };

        println!("\n{}", "=".repeat(60));
        println!("  {} ({} tokens, {})", job.name(), total, scope);
        if let Some(entry) = &job.entry {
            println!(
                "  Prompt slug: {} | {} | {} prompt tokens",
                entry.slug,
                job.tier_label(),
                job.prompt_tokens
            );
        }
        println!("{}", "=".repeat(60));

        let analysis = analyze_paragraphs(tokenizer, &job.text, job.prompt_tokens, &budget);
        print_analysis(&analysis, args.max_tokens);
    }
    Ok(())
}

fn print_analysis(analysis: &BudgetAnalysis, max_tokens: usize) {
    println!(
        "  Token budget: {} total - {} prompt - {} separator = {} for response\n",
        max_tokens, analysis.prompt_tokens, analysis.separator_tokens, analysis.budget
    );
    println!("  {:>4}  {:>6}  {:>7}  Text", "Para", "Tokens", "Running");
    println!("  {:>4}  {:>6}  {:>7}  ----", "----", "------", "-------");
    for row in &analysis.rows {
        let marker = if analysis.cutoff == Some(row.number) {
            "  <-- CUTOFF"
        } else {
            ""
        };
        println!(
            "  {:4}  {:6}  {:7}{}  {}",
            row.number, row.tokens, row.running, marker, row.preview
        );
    }
    println!();

    if analysis.cutoff.is_some() {
        let excluded = analysis.excluded_tokens();
        let percent = if analysis.total_tokens > 0 {
            excluded as f64 / analysis.total_tokens as f64 * 100.0
        } else {
            0.0
        };
        println!("  Clean cut: {} tokens (paragraph before the cutoff)", analysis.clean_cut_tokens);
        println!("  Full essay: {} tokens", analysis.total_tokens);
        println!("  Excluded: {} tokens ({:.0}% of essay)", excluded, percent);
    } else {
        println!("  Full essay fits! {} / {} tokens used", analysis.total_tokens, analysis.budget);
    }
    if analysis.approximate {
        println!("  (approximate counts)");
    }
}

fn run_cut<T: Tokenizer>(args: &EssayArgs, tokenizer: &T, policy: MatchPolicy) -> CliResult<()> {
    let jobs = plan_essay_jobs(args, tokenizer, policy)?;
    if jobs.len() > 1 && args.prompts.is_none() {
        return Err("cutting several files needs --prompts".into());
    }

    let budget = BudgetConfig::new(tokenizer, args.max_tokens);
    for job in &jobs {
        let truncation = truncate_response(tokenizer, &job.text, job.prompt_tokens, &budget);
        if let Some(entry) = &job.entry {
            eprintln!(
                "# {} (slug: {}, {}, prompt: {} tokens, response: {} tokens)",
                job.name(),
                entry.slug,
                job.tier_label(),
                job.prompt_tokens,
                truncation.original_tokens
            );
        }
        if truncation.status == TruncationStatus::Empty {
            warn!(file = %job.name(), budget = truncation.budget, "nothing fits in the budget");
        }
        println!("{}", truncation.text);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// build-pairs
// ---------------------------------------------------------------------------

fn print_block_errors(errors: &[BlockError]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("WARNING: {} malformed blocks (kept verbatim):", errors.len());
    for error in errors {
        eprintln!("  {}", error);
    }
}

fn run_build_pairs(args: &BuildPairsArgs, policy: MatchPolicy) -> CliResult<()> {
    let entries = parse_prompts(&read_text(&args.prompts)?);
    if entries.is_empty() {
        return Err(Error::NoPrompts(args.prompts.clone()).into());
    }
    let entries = select_prompts(entries, args.slug.as_deref())?;

    let config = PipelineConfig {
        essay_suffix: args.essay_suffix.clone(),
        match_policy: policy,
        ..Default::default()
    };
    let essays = discover_essays(&args.essays, &config.essay_suffix);
    info!(prompts = entries.len(), essays = essays.len(), "building pairs");

    let fresh = assemble_fresh_pairs(&entries, &essays, config.match_policy)?;
    for warning in &fresh.warnings {
        eprintln!("  WARNING: {}", warning);
    }
    if !fresh.unresolved.is_empty() {
        eprintln!("  Unresolved slugs: {}", fresh.unresolved.join(", "));
    }
    if fresh.pairs.is_empty() {
        println!("No pairs to build.");
        return Ok(());
    }

    if !args.target.exists() {
        return Err(format!("target document not found: {}", args.target.display()).into());
    }
    let parsed = parse_document(&read_text(&args.target)?);
    print_block_errors(&parsed.errors);
    let mut document = parsed.document;

    let mode = if args.regenerate {
        MergeMode::Regenerate
    } else {
        MergeMode::Append
    };
    let report = merge_pairs(&mut document, &fresh.pairs, mode);

    for change in &report.updated {
        println!("  ~ {} ({} -> {} chars)", change.label, change.old_len, change.new_len);
    }
    for pair in &report.added {
        print_added_pair(pair);
    }
    if report.is_noop() {
        println!("Nothing to do: {} pairs already up to date.", report.unchanged);
        return Ok(());
    }
    println!(
        "\n{} added, {} updated, {} unchanged",
        report.added.len(),
        report.updated.len(),
        report.unchanged
    );
    if args.dry_run {
        println!("Dry run: {} not written.", args.target.display());
        return Ok(());
    }

    match mode {
        MergeMode::Regenerate => {
            std::fs::write(&args.target, render_document(&document)).map_err(|e| Error::io(&args.target, e))?;
        }
        MergeMode::Append => append_text(&args.target, &render_appendix(&report.added))?,
    }
    println!("Wrote {}", args.target.display());
    Ok(())
}

fn print_added_pair(pair: &Pair) {
    let tier = pair.tier.map(|tier| format!("T{}", tier)).unwrap_or_else(|| "T?".to_string());
    println!(
        "  + {} ({}, {} chars) {}",
        pair.label,
        tier,
        pair.response.len(),
        preview(&pair.response, 60)
    );
}

fn append_text(path: &Path, text: &str) -> CliResult<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(text.as_bytes()).map_err(|e| Error::io(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// truncate-pairs
// ---------------------------------------------------------------------------

fn run_truncate_pairs<T: Tokenizer>(args: &TruncatePairsArgs, tokenizer: &T) -> CliResult<()> {
    let output = match &args.output {
        Some(output) => output.clone(),
        None => derived_output_path(&args.input).ok_or("input name has no 'llama' to replace; pass --output")?,
    };

    let parsed = parse_document(&read_text(&args.input)?);
    print_block_errors(&parsed.errors);
    if parsed.document.pairs().next().is_none() {
        return Err(Error::NoPairs(args.input.clone()).into());
    }

    let is_validation = args
        .input
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains("val"));
    let header = if is_validation {
        SHORT_VAL_HEADER
    } else {
        SHORT_TRAIN_HEADER
    };

    let config = PipelineConfig {
        short_max_tokens: args.max_tokens,
        skip_tiers: args.skip_tiers.clone(),
        ..Default::default()
    };
    let budget = BudgetConfig::new(tokenizer, config.short_max_tokens);
    let derived = derive_budgeted_pairs(&parsed.document, tokenizer, &budget, &config.skip_tiers, header);

    println!("  {:<40} {:>4}  {:>6}  {:>8}  {:>6}  Status", "Label", "Tier", "Prompt", "Original", "Kept");
    for pair in &derived.pairs {
        let status = match pair.truncation.status {
            TruncationStatus::Fits => "fits".to_string(),
            TruncationStatus::Truncated { percent_removed } => format!("cut {:.0}%", percent_removed),
            TruncationStatus::Empty => "EMPTY".to_string(),
        };
        let tier = pair.tier.map(|tier| tier.to_string()).unwrap_or_else(|| "?".to_string());
        println!(
            "  {:<40} {:>4}  {:>6}  {:>8}  {:>6}  {}",
            pair.label, tier, pair.prompt_tokens, pair.truncation.original_tokens, pair.truncation.tokens, status
        );
    }

    if !derived.skipped.is_empty() {
        println!("\nSkipped {} pairs by tier: {}", derived.skipped.len(), derived.skipped.join(", "));
    }
    let empty = derived.empty_labels();
    if !empty.is_empty() {
        eprintln!("WARNING: {} pairs left out, nothing fits: {}", empty.len(), empty.join(", "));
    }

    println!("\n[summary]");
    println!("  Pairs: {}", derived.pairs.len());
    println!("  Truncated: {}", derived.truncated_count());
    println!("  Written: {}", derived.document.pairs().count());
    if derived.approximate {
        println!("  (approximate counts)");
    }

    if args.dry_run {
        println!("Dry run: {} not written.", output.display());
        return Ok(());
    }
    std::fs::write(&output, render_document(&derived.document)).map_err(|e| Error::io(&output, e))?;
    println!("  Output: {}", output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

fn run_export(args: &ExportArgs, short_spec: &TokenizerSpec) -> CliResult<()> {
    let parsed = parse_document(&read_text(&args.pairs)?);
    if !parsed.errors.is_empty() {
        eprintln!("ERRORS:");
        for error in &parsed.errors {
            eprintln!("  {}", error);
        }
    }
    let pairs: Vec<Pair> = parsed.document.pairs().cloned().collect();
    if pairs.is_empty() {
        return Err(Error::NoPairs(args.pairs.clone()).into());
    }

    let config = PipelineConfig {
        short_max_tokens: args.short_max_tokens,
        long_max_tokens: args.long_max_tokens,
        ..Default::default()
    };

    if args.stats {
        let stats = pair_stats(&pairs, &config);
        println!("\n[stats]");
        println!("  Total pairs: {}", stats.total);
        println!("  Train: {}  Val: {}", stats.train, stats.val);
        for (tier, count) in &stats.by_tier {
            let tier = if *tier == 0 { "?".to_string() } else { tier.to_string() };
            println!("  Tier {}: {}", tier, count);
        }
        for warning in &stats.warnings {
            eprintln!("  WARNING: {}", warning);
        }
        return Ok(());
    }

    let short = load_tokenizer(short_spec)?;
    let long = load_tokenizer(&args.long_tokenizer)?;

    let reports = validate_pairs(&pairs, &short, &long, &config);
    let over_short = reports.iter().filter(|r| r.exceeds_short).count();
    let over_long = reports.iter().filter(|r| r.exceeds_long).count();
    for report in reports.iter().filter(|r| r.exceeds_short || r.exceeds_long) {
        eprintln!(
            "  WARNING: {} (T{}, {}) short {} / {}, long {} / {}",
            report.label,
            report.tier,
            report.split,
            report.short_tokens,
            config.short_max_tokens,
            report.long_tokens,
            config.long_max_tokens
        );
    }
    println!("Validated {} pairs: {} over short limit, {} over long limit", reports.len(), over_short, over_long);

    if args.validate_only {
        return Ok(());
    }

    println!("Writing output to {:?}...", args.output_dir);
    let result = write_jsonl_output(&pairs, &args.output_dir, &short, &config)?;

    let metadata_path = args.output_dir.join("metadata.json");
    let metadata = serde_json::json!({
        "config": {
            "pairs": args.pairs.to_string_lossy(),
            "output_dir": args.output_dir.to_string_lossy(),
            "short_tokenizer": short_spec.to_string(),
            "long_tokenizer": args.long_tokenizer.to_string(),
            "short_max_tokens": config.short_max_tokens,
            "long_max_tokens": config.long_max_tokens,
        },
        "counts": {
            "total_pairs": pairs.len(),
            "long_train": result.long_train,
            "long_val": result.long_val,
            "short_train": result.short_train,
            "short_val": result.short_val,
            "short_skipped": result.short_skipped,
            "malformed_blocks": parsed.errors.len(),
        },
        "validation": reports,
        "approximate": result.approximate || long.is_approximate(),
        "files": result.files,
    });
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
        .map_err(|e| Error::io(&metadata_path, e))?;

    println!("\n[summary]");
    println!("  Pairs: {}", pairs.len());
    println!("  Long-context train/val: {} / {}", result.long_train, result.long_val);
    println!("  Short-context train/val: {} / {}", result.short_train, result.short_val);
    println!("  Skipped (over {} tokens): {}", config.short_max_tokens, result.short_skipped);
    println!("  Output: {:?}/{{llama,gpt2}}_{{train,val}}.jsonl", args.output_dir);
    println!("  Metadata: {:?}", metadata_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<PromptEntry> {
        parse_prompts("## ai-essay\ntier: 4\nSummary.\n## ai-essay-part-2\ntier: 4\nSecond summary.\n## pending\ntier: 3\n")
    }

    #[test]
    fn test_resolve_essay_prompt() {
        let entries = entries();
        let found = resolve_essay_prompt("01_other_clean", &entries, MatchPolicy::FirstMatch);
        assert_eq!(found, Err("01_other_clean (no matching prompt)".to_string()));

        let found = resolve_essay_prompt("ai_essay_clean", &entries, MatchPolicy::RejectAmbiguous);
        assert_eq!(found.map(|entry| entry.slug.as_str()), Ok("ai-essay"));
    }

    #[test]
    fn test_ambiguous_essay_names_candidates() {
        let entries = entries();
        let strict = resolve_essay_prompt("ai_essay_part_2_clean", &entries, MatchPolicy::RejectAmbiguous);
        assert_eq!(
            strict,
            Err("ai_essay_part_2_clean (ambiguous: matches ai-essay, ai-essay-part-2)".to_string())
        );

        let lenient = resolve_essay_prompt("ai_essay_part_2_clean", &entries, MatchPolicy::FirstMatch);
        assert_eq!(lenient.map(|entry| entry.slug.as_str()), Ok("ai-essay"));
    }

    #[test]
    fn test_entry_without_prompt_text_is_skipped() {
        let entries = entries();
        let pending = resolve_essay_prompt("pending_clean", &entries, MatchPolicy::FirstMatch);
        assert_eq!(pending, Err("pending_clean (empty prompt)".to_string()));
    }
}
