//! Error types for pair building.
//!
//! Only conditions that stop a whole run live here. Problems scoped to a
//! single pair block are collected as [`crate::BlockError`] values instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    #[error("slug '{0}' not found in prompts file")]
    PromptNotFound(String),

    #[error("no prompts found in {0:?}")]
    NoPrompts(PathBuf),

    #[error("no valid pairs found in {0:?}")]
    NoPairs(PathBuf),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
