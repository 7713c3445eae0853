//! Pair documents: parsing `## pair:` blocks and rendering them back.
//!
//! A document is an optional free-text header followed by pair blocks:
//!
//! ```text
//! ## pair: <label>
//! tier: <int>            (optional)
//! split: <train|val>     (optional, default train)
//!
//! ### prompt
//! <prompt text>
//!
//! ### response
//! <response text>
//! ---
//! ```
//!
//! Parsing is block-local. A block that fails to parse is reported as a
//! [`BlockError`] and kept verbatim as [`Block::Malformed`], so later blocks
//! are unaffected and re-rendering never drops content.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::helpers::normalize_label;

const PAIR_HEADING: &str = "## pair:";
const PROMPT_MARKER: &str = "### prompt";
const RESPONSE_MARKER: &str = "### response";

static TIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tier:\s*(\d+)").unwrap());
static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^split:\s*(\w+)").unwrap());

/// Dataset split a pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
}

impl Split {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "train" => Some(Split::Train),
            "val" => Some(Split::Val),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub label: String,
    /// `None` when the block carries no `tier:` line.
    pub tier: Option<u32>,
    /// `None` when the block carries no `split:` line.
    pub split: Option<Split>,
    pub prompt: String,
    pub response: String,
}

impl Pair {
    pub fn new(
        label: impl Into<String>,
        tier: Option<u32>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            tier,
            split: None,
            prompt: prompt.into(),
            response: response.into(),
        }
    }

    /// Tier with `0` standing for unspecified.
    pub fn tier_or_unspecified(&self) -> u32 {
        self.tier.unwrap_or(0)
    }

    pub fn effective_split(&self) -> Split {
        self.split.unwrap_or(Split::Train)
    }

    pub fn normalized_label(&self) -> String {
        normalize_label(&self.label)
    }
}

/// One block of a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Pair(Pair),
    /// Raw text of a block that failed to parse.
    Malformed(String),
}

/// A header plus its blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairDocument {
    pub header: String,
    pub blocks: Vec<Block>,
}

impl PairDocument {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            blocks: Vec::new(),
        }
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Pair(pair) => Some(pair),
            Block::Malformed(_) => None,
        })
    }

    pub fn pairs_mut(&mut self) -> impl Iterator<Item = &mut Pair> {
        self.blocks.iter_mut().filter_map(|block| match block {
            Block::Pair(pair) => Some(pair),
            Block::Malformed(_) => None,
        })
    }

    pub fn push(&mut self, pair: Pair) {
        self.blocks.push(Block::Pair(pair));
    }

    pub fn malformed_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| matches!(block, Block::Malformed(_)))
            .count()
    }
}

/// Why a single block was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockErrorKind {
    #[error("could not parse ## pair: heading")]
    UnparseableHeading,
    #[error("tier must be a non-negative integer that fits in u32, got '{0}'")]
    InvalidTier(String),
    #[error("split must be 'train' or 'val', got '{0}'")]
    InvalidSplit(String),
    #[error("missing ### prompt section")]
    MissingPrompt,
    #[error("missing ### response section")]
    MissingResponse,
    #[error("empty prompt")]
    EmptyPrompt,
    #[error("empty response")]
    EmptyResponse,
    #[error("duplicate label")]
    DuplicateLabel,
}

/// A block-scoped parse or validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockError {
    /// 1-based block number within the document.
    pub index: usize,
    pub label: Option<String>,
    pub kind: BlockErrorKind,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "'{}': {}", label, self.kind),
            None => write!(f, "block {}: {}", self.index, self.kind),
        }
    }
}

impl std::error::Error for BlockError {}

/// Result of parsing a whole document.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub document: PairDocument,
    pub errors: Vec<BlockError>,
}

/// Where the block scanner is inside one pair block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fields,
    Prompt,
    Response,
}

/// Accumulates the lines of one block as the scanner walks it.
struct BlockScanner<'a> {
    section: Section,
    tier: Option<&'a str>,
    split: Option<&'a str>,
    prompt: Option<Vec<&'a str>>,
    response: Option<Vec<&'a str>>,
}

impl<'a> BlockScanner<'a> {
    fn new() -> Self {
        Self {
            section: Section::Fields,
            tier: None,
            split: None,
            prompt: None,
            response: None,
        }
    }

    fn feed(&mut self, line: &'a str) {
        match self.section {
            Section::Fields => {
                if is_marker(line, PROMPT_MARKER) {
                    self.section = Section::Prompt;
                    self.prompt = Some(Vec::new());
                } else if is_marker(line, RESPONSE_MARKER) {
                    self.section = Section::Response;
                    self.response = Some(Vec::new());
                } else {
                    self.capture_field(line);
                }
            }
            Section::Prompt => {
                if is_marker(line, RESPONSE_MARKER) {
                    self.section = Section::Response;
                    self.response = Some(Vec::new());
                } else if let Some(lines) = self.prompt.as_mut() {
                    lines.push(line);
                }
            }
            Section::Response => {
                if let Some(lines) = self.response.as_mut() {
                    lines.push(line);
                }
            }
        }
    }

    fn capture_field(&mut self, line: &'a str) {
        if self.tier.is_none() {
            if let Some(caps) = TIER_RE.captures(line) {
                self.tier = caps.get(1).map(|m| m.as_str());
                return;
            }
        }
        if self.split.is_none() {
            if let Some(caps) = SPLIT_RE.captures(line) {
                self.split = caps.get(1).map(|m| m.as_str());
            }
        }
    }

    fn finish(self, label: String) -> Result<Pair, BlockErrorKind> {
        let tier = match self.tier {
            Some(raw) => Some(raw.parse().map_err(|_| BlockErrorKind::InvalidTier(raw.to_string()))?),
            None => None,
        };
        let split = match self.split {
            Some(raw) => Some(Split::parse(raw).ok_or_else(|| BlockErrorKind::InvalidSplit(raw.to_lowercase()))?),
            None => None,
        };
        let prompt = self.prompt.ok_or(BlockErrorKind::MissingPrompt)?;
        let response = self.response.ok_or(BlockErrorKind::MissingResponse)?;

        let prompt = prompt.join("\n").trim().to_string();
        let response = strip_trailing_rule(response.join("\n").trim()).to_string();
        if prompt.is_empty() {
            return Err(BlockErrorKind::EmptyPrompt);
        }
        if response.is_empty() {
            return Err(BlockErrorKind::EmptyResponse);
        }

        Ok(Pair {
            label,
            tier,
            split,
            prompt,
            response,
        })
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.trim_end() == marker
}

fn is_rule(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 2 && line.chars().all(|c| c == '-')
}

/// Drop a trailing separator line made only of dashes.
fn strip_trailing_rule(text: &str) -> &str {
    match text.rfind('\n') {
        Some(pos) if is_rule(&text[pos + 1..]) => text[..pos].trim_end(),
        None if is_rule(text) => "",
        _ => text,
    }
}

fn parse_block(index: usize, lines: &[&str]) -> Result<Pair, BlockError> {
    let heading = lines[0];
    let label = heading[PAIR_HEADING.len()..].trim();
    if label.is_empty() {
        return Err(BlockError {
            index,
            label: None,
            kind: BlockErrorKind::UnparseableHeading,
        });
    }

    let mut scanner = BlockScanner::new();
    for &line in &lines[1..] {
        scanner.feed(line);
    }
    scanner.finish(label.to_string()).map_err(|kind| BlockError {
        index,
        label: Some(label.to_string()),
        kind,
    })
}

/// Parse a document into pairs, collecting per-block errors.
///
/// Never fails as a whole: the caller decides whether any collected error is
/// fatal for its run.
pub fn parse_document(text: &str) -> ParsedDocument {
    let mut header: Vec<&str> = Vec::new();
    let mut raw_blocks: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        if line.starts_with(PAIR_HEADING) {
            raw_blocks.push(vec![line]);
        } else if let Some(block) = raw_blocks.last_mut() {
            block.push(line);
        } else {
            header.push(line);
        }
    }

    let mut document = PairDocument::new(strip_trailing_rule(header.join("\n").trim_end()).trim_end());
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, lines) in raw_blocks.iter().enumerate() {
        let index = i + 1;
        let parsed = parse_block(index, lines).and_then(|pair| {
            if seen.insert(pair.normalized_label()) {
                Ok(pair)
            } else {
                Err(BlockError {
                    index,
                    label: Some(pair.label),
                    kind: BlockErrorKind::DuplicateLabel,
                })
            }
        });

        match parsed {
            Ok(pair) => document.push(pair),
            Err(error) => {
                let raw = lines.join("\n");
                document
                    .blocks
                    .push(Block::Malformed(strip_trailing_rule(raw.trim()).to_string()));
                errors.push(error);
            }
        }
    }

    ParsedDocument { document, errors }
}

/// Render a single pair as a markdown block (without the trailing rule).
pub fn render_pair(pair: &Pair) -> String {
    let mut lines = vec![format!("{} {}", PAIR_HEADING, pair.label)];
    if let Some(tier) = pair.tier {
        lines.push(format!("tier: {}", tier));
    }
    if let Some(split) = pair.split {
        lines.push(format!("split: {}", split));
    }
    lines.push(String::new());
    lines.push(PROMPT_MARKER.to_string());
    lines.push(pair.prompt.clone());
    lines.push(String::new());
    lines.push(RESPONSE_MARKER.to_string());
    lines.push(pair.response.clone());
    lines.join("\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Pair(pair) => render_pair(pair),
        Block::Malformed(raw) => raw.clone(),
    }
}

/// Render a whole document: header, then every block followed by a rule.
pub fn render_document(document: &PairDocument) -> String {
    let mut parts = Vec::new();
    if !document.header.is_empty() {
        parts.push(document.header.trim_end().to_string());
        parts.push("---".to_string());
    }
    for block in &document.blocks {
        parts.push(render_block(block));
        parts.push("---".to_string());
    }
    if parts.is_empty() {
        return String::new();
    }
    parts.join("\n\n") + "\n"
}

/// Text to append to an existing document so it gains `pairs`.
pub fn render_appendix<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> String {
    let mut parts = Vec::new();
    for pair in pairs {
        parts.push(render_pair(pair));
        parts.push("---".to_string());
    }
    if parts.is_empty() {
        return String::new();
    }
    format!("\n\n{}\n", parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Training pairs\n\nInstructions for editors.\n\n---\n\n\
## pair: first-essay\ntier: 3\nsplit: val\n\n### prompt\nThe opening.\n\n### response\nThe rest.\n\nMore.\n\n---\n\n\
## pair: second_essay\n\n### prompt\nSummarize.\n\n### response\nA summary.\n--\n";

    #[test]
    fn test_parse_document() {
        let parsed = parse_document(DOC);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.document.header, "# Training pairs\n\nInstructions for editors.");

        let pairs: Vec<&Pair> = parsed.document.pairs().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].label, "first-essay");
        assert_eq!(pairs[0].tier, Some(3));
        assert_eq!(pairs[0].effective_split(), Split::Val);
        assert_eq!(pairs[0].prompt, "The opening.");
        assert_eq!(pairs[0].response, "The rest.\n\nMore.");

        assert_eq!(pairs[1].tier_or_unspecified(), 0);
        assert_eq!(pairs[1].effective_split(), Split::Train);
        assert_eq!(pairs[1].response, "A summary.");
    }

    #[test]
    fn test_bad_blocks_do_not_affect_neighbours() {
        let text = "## pair: no-prompt\n\n### response\nOnly a response.\n---\n\
## pair: bad-split\nsplit: test\n\n### prompt\nP\n\n### response\nR\n---\n\
## pair: empty-response\n\n### prompt\nP\n\n### response\n\n---\n\
## pair:   \n### prompt\nP\n### response\nR\n---\n\
## pair: good\n\n### prompt\nP\n\n### response\nR\n";
        let parsed = parse_document(text);

        let kinds: Vec<&BlockErrorKind> = parsed.errors.iter().map(|e| &e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &BlockErrorKind::MissingPrompt,
                &BlockErrorKind::InvalidSplit("test".to_string()),
                &BlockErrorKind::EmptyResponse,
                &BlockErrorKind::UnparseableHeading,
            ]
        );
        assert_eq!(parsed.errors[0].to_string(), "'no-prompt': missing ### prompt section");
        assert_eq!(parsed.errors[3].to_string(), "block 4: could not parse ## pair: heading");

        let labels: Vec<&str> = parsed.document.pairs().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["good"]);
        assert_eq!(parsed.document.malformed_count(), 4);
    }

    #[test]
    fn test_tier_overflow_is_a_block_error() {
        let parsed = parse_document("## pair: huge\ntier: 99999999999\n### prompt\nP\n### response\nR\n");
        assert_eq!(parsed.document.pairs().count(), 0);
        assert_eq!(
            parsed.errors[0].kind,
            BlockErrorKind::InvalidTier("99999999999".to_string())
        );
    }

    #[test]
    fn test_missing_response_marker() {
        let parsed = parse_document("## pair: x\n\n### prompt\nOnly a prompt.\n");
        assert_eq!(parsed.errors[0].kind, BlockErrorKind::MissingResponse);
    }

    #[test]
    fn test_duplicate_labels_after_normalization() {
        let text = "## pair: same_label\n### prompt\nP\n### response\nR\n\
## pair: same-label\n### prompt\nP2\n### response\nR2\n";
        let parsed = parse_document(text);
        assert_eq!(parsed.document.pairs().count(), 1);
        assert_eq!(parsed.errors[0].kind, BlockErrorKind::DuplicateLabel);
        assert_eq!(parsed.errors[0].label.as_deref(), Some("same-label"));
    }

    #[test]
    fn test_fields_inside_sections_are_content() {
        let text = "## pair: x\n\n### prompt\ntier: 9\n\n### response\nsplit: nonsense\n";
        let parsed = parse_document(text);
        assert!(parsed.errors.is_empty());
        let pair = parsed.document.pairs().next().unwrap();
        assert_eq!(pair.tier, None);
        assert_eq!(pair.prompt, "tier: 9");
        assert_eq!(pair.response, "split: nonsense");
    }

    #[test]
    fn test_document_without_header() {
        let parsed = parse_document("## pair: only\n### prompt\nP\n### response\nR");
        assert_eq!(parsed.document.header, "");
        assert_eq!(parsed.document.pairs().count(), 1);
    }

    #[test]
    fn test_render_then_parse_is_stable() {
        let parsed = parse_document(DOC);
        let rendered = render_document(&parsed.document);
        assert!(rendered.starts_with("# Training pairs\n\nInstructions for editors.\n\n---\n\n## pair: first-essay\ntier: 3\nsplit: val\n"));

        let reparsed = parse_document(&rendered);
        assert_eq!(reparsed.document, parsed.document);
        assert_eq!(render_document(&reparsed.document), rendered);
    }

    #[test]
    fn test_malformed_blocks_survive_rendering() {
        let text = "Header\n---\n## pair: broken\nno markers here\n---\n## pair: ok\n### prompt\nP\n### response\nR\n";
        let parsed = parse_document(text);
        let rendered = render_document(&parsed.document);
        assert!(rendered.contains("## pair: broken\nno markers here\n\n---"));

        let reparsed = parse_document(&rendered);
        assert_eq!(reparsed.document, parsed.document);
        assert_eq!(reparsed.errors.len(), 1);
    }

    #[test]
    fn test_render_pair_and_appendix() {
        let pair = Pair::new("slug", Some(4), "Prompt.", "Response.");
        assert_eq!(
            render_pair(&pair),
            "## pair: slug\ntier: 4\n\n### prompt\nPrompt.\n\n### response\nResponse."
        );

        let appendix = render_appendix([&pair]);
        assert!(appendix.starts_with("\n\n## pair: slug"));
        assert!(appendix.ends_with("Response.\n\n---\n"));
        assert_eq!(render_appendix(std::iter::empty::<&Pair>()), "");
    }
}
