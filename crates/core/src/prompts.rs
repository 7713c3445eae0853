//! Prompts file: the registry of slugs, tiers and prompt texts.
//!
//! ```text
//! ## essay-slug
//! tier: 3
//! Prompt text here...
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static LEADING_TIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tier:\s*(\d+)").unwrap());

/// One prompt registered under a slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptEntry {
    pub slug: String,
    pub tier: Option<u32>,
    pub prompt: String,
}

fn parse_entry(heading: &str, body: &[&str]) -> Option<PromptEntry> {
    let slug = heading.trim();
    if slug.is_empty() {
        return None;
    }

    let body = body.join("\n");
    let mut prompt = body.trim();
    let mut tier = None;
    if let Some(caps) = LEADING_TIER_RE.captures(prompt) {
        tier = caps[1].parse().ok();
        prompt = prompt[caps[0].len()..].trim();
    }

    if prompt.is_empty() && tier.is_none() {
        return None;
    }
    Some(PromptEntry {
        slug: slug.to_string(),
        tier,
        prompt: prompt.to_string(),
    })
}

/// Parse a prompts file into entries, in file order.
///
/// Text before the first `## ` heading is ignored. A slug that appears twice
/// keeps its first position but takes the later content.
pub fn parse_prompts(text: &str) -> Vec<PromptEntry> {
    let mut sections: Vec<(&str, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            sections.push((heading, Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }

    let mut entries: Vec<PromptEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (heading, body) in &sections {
        let Some(entry) = parse_entry(heading, body) else {
            continue;
        };
        match positions.get(&entry.slug) {
            Some(&pos) => entries[pos] = entry,
            None => {
                positions.insert(entry.slug.clone(), entries.len());
                entries.push(entry);
            }
        }
    }
    entries
}
