use std::path::PathBuf;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum SyllabusError {
    #[error("Generation failed: {reason}")]
    Generation { reason: String },

    #[error("Invalid model response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Checkpoint write failed for {curriculum_id}: {reason}")]
    Persistence {
        curriculum_id: String,
        reason: String,
    },

    #[error("Curriculum {curriculum_id} not found")]
    CurriculumNotFound { curriculum_id: String },

    #[error("Corpus read failed for {path}: {reason}")]
    Corpus { path: PathBuf, reason: String },

    #[error("Corpus has no videos")]
    EmptyCorpus,

    #[error("Invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Checkpoint writer is no longer running")]
    WriterClosed,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SyllabusError>;
