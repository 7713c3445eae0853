//! Tokenizer backends for the CLI.
//!
//! BPE encodings come from `tiktoken-rs`; any HuggingFace tokenizer can be
//! loaded by name or from a local `tokenizer.json`. The character-based
//! approximation is only used when selected explicitly.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pair_budget_core::{CharApproxTokenizer, Error, Tokenizer};
use tiktoken_rs::CoreBPE;
use tokenizers::Tokenizer as HfTokenizer;

/// Which tokenizer to load, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerSpec {
    /// GPT-2's BPE (`r50k_base`).
    Gpt2,
    /// `cl100k_base`, a proxy for Llama token counts.
    Cl100k,
    /// Length divided by four. Counts are flagged as approximate.
    Approx,
    /// A HuggingFace model name or path to a `tokenizer.json`.
    HuggingFace(String),
}

impl FromStr for TokenizerSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt2" | "r50k" => Ok(TokenizerSpec::Gpt2),
            "cl100k" => Ok(TokenizerSpec::Cl100k),
            "approx" => Ok(TokenizerSpec::Approx),
            other => match other.strip_prefix("hf:") {
                Some(name) if !name.is_empty() => Ok(TokenizerSpec::HuggingFace(name.to_string())),
                _ => Err(format!(
                    "unknown tokenizer '{}' (expected gpt2, cl100k, approx or hf:<name>)",
                    other
                )),
            },
        }
    }
}

impl fmt::Display for TokenizerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerSpec::Gpt2 => f.write_str("gpt2"),
            TokenizerSpec::Cl100k => f.write_str("cl100k"),
            TokenizerSpec::Approx => f.write_str("approx"),
            TokenizerSpec::HuggingFace(name) => write!(f, "hf:{}", name),
        }
    }
}

/// Wrapper around a tiktoken BPE encoding.
struct BpeTokenizer {
    inner: CoreBPE,
}

impl Tokenizer for BpeTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.inner.encode_ordinary(text).len()
    }
}

/// Wrapper around HuggingFace tokenizers for token counting.
struct HuggingFaceTokenizer {
    inner: HfTokenizer,
}

impl HuggingFaceTokenizer {
    /// Load from a local `tokenizer.json` if `name` is a file, else from the hub.
    fn load(name: &str) -> Result<Self, Error> {
        let loaded = if Path::new(name).is_file() {
            HfTokenizer::from_file(name)
        } else {
            HfTokenizer::from_pretrained(name, None)
        };
        let inner = loaded.map_err(|e| Error::TokenizerUnavailable(format!("{}: {}", name, e)))?;
        Ok(Self { inner })
    }
}

impl Tokenizer for HuggingFaceTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.inner
            .encode(text, false)
            .expect("Failed to encode text with tokenizer")
            .get_ids()
            .len()
    }
}

/// Load the tokenizer named by `spec`.
///
/// Failure is fatal for the caller: budgets cannot be computed without a
/// tokenizer, and falling back to the approximation silently would present
/// estimates as exact counts.
pub fn load(spec: &TokenizerSpec) -> Result<Box<dyn Tokenizer>, Error> {
    let tokenizer: Box<dyn Tokenizer> = match spec {
        TokenizerSpec::Gpt2 => Box::new(BpeTokenizer {
            inner: tiktoken_rs::r50k_base().map_err(|e| unavailable(spec, e))?,
        }),
        TokenizerSpec::Cl100k => Box::new(BpeTokenizer {
            inner: tiktoken_rs::cl100k_base().map_err(|e| unavailable(spec, e))?,
        }),
        TokenizerSpec::Approx => Box::new(CharApproxTokenizer),
        TokenizerSpec::HuggingFace(name) => Box::new(HuggingFaceTokenizer::load(name)?),
    };
    Ok(tokenizer)
}

fn unavailable(spec: &TokenizerSpec, e: impl fmt::Display) -> Error {
    Error::TokenizerUnavailable(format!("{}: {}", spec, e))
}
