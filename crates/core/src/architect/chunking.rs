//! Chunked expansion of one module into lessons.
//!
//! The module's source context is cut into overlapping windows, each window
//! is expanded by its own generation call (bounded concurrency, retried), and
//! the lessons are concatenated back in chunk order.

use futures::stream::{self, StreamExt};
use serde_json::Value;

use super::{Architect, lessons};
use crate::{
    error::Result,
    generation::GenerationRequest,
    progress::{RunReport, WorkUnit},
    prompts,
    types::{Lesson, Module},
};

/// A window of the module context. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Cut `text` into windows of `window` characters, each starting
/// `window - overlap` after the previous one. The last window ends exactly at
/// the end of the text. Requires `overlap < window`.
pub fn split_into_chunks(text: &str, window: usize, overlap: usize) -> Vec<Chunk<'_>> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = boundaries.len() - 1;
    if total == 0 || window == 0 {
        return Vec::new();
    }
    let step = window.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(total);
        chunks.push(Chunk {
            index: chunks.len(),
            start,
            end,
            text: &text[boundaries[start]..boundaries[end]],
        });
        if end == total {
            break;
        }
        start += step;
    }
    chunks
}

/// Result of expanding one module. `error` is set when no chunk produced a
/// usable reply.
#[derive(Debug, Default)]
pub struct ModuleExpansion {
    pub lessons: Vec<Lesson>,
    pub report: RunReport,
    pub error: Option<String>,
}

impl ModuleExpansion {
    pub fn failed(module: usize, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut report = RunReport::default();
        report.record(WorkUnit::Module { module }, reason.clone());
        Self {
            lessons: Vec::new(),
            report,
            error: Some(reason),
        }
    }

    /// Write the expansion into `module`. Lessons already on the module are
    /// only replaced when the expansion produced some.
    pub fn apply_to(mut self, module_idx: usize, module: &mut Module) -> RunReport {
        if !self.lessons.is_empty() {
            module.lessons = self.lessons;
        }
        module.error = match self.error {
            Some(reason) => Some(reason),
            None if module.lessons.is_empty() => {
                let reason = "expansion produced no lessons".to_string();
                self.report
                    .record(WorkUnit::Module { module: module_idx }, reason.clone());
                Some(reason)
            }
            None => None,
        };
        self.report
    }
}

impl Architect {
    /// Expand `module` (at position `module_idx`) from `context`.
    pub async fn expand_module(
        &self,
        module_idx: usize,
        module: &Module,
        context: &str,
    ) -> ModuleExpansion {
        let chunks = split_into_chunks(
            context,
            self.config.chunk_window_chars,
            self.config.chunk_overlap_chars,
        );
        if chunks.is_empty() {
            return ModuleExpansion::failed(module_idx, "no source material for module");
        }

        let total = chunks.len();
        tracing::debug!(module = module_idx, chunks = total, "expanding module");

        let mut results: Vec<(usize, Result<Vec<Value>>)> = stream::iter(chunks.iter())
            .map(move |chunk| async move {
                let reply = self.expand_chunk(module_idx, module, chunk, total).await;
                (chunk.index, reply)
            })
            .buffer_unordered(self.config.chunk_concurrency)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let mut report = RunReport::default();
        let mut entries = Vec::new();
        let mut failed = 0;
        for (chunk, reply) in results {
            match reply {
                Ok(values) => entries.extend(values),
                Err(e) => {
                    failed += 1;
                    report.record(
                        WorkUnit::Chunk {
                            module: module_idx,
                            chunk,
                        },
                        e.to_string(),
                    );
                }
            }
        }

        let error = (failed == total).then(|| format!("all {total} chunks failed"));
        if let Some(reason) = &error {
            report.record(WorkUnit::Module { module: module_idx }, reason.clone());
        }

        ModuleExpansion {
            lessons: lessons::lessons_from_values(&entries),
            report,
            error,
        }
    }

    async fn expand_chunk(
        &self,
        module_idx: usize,
        module: &Module,
        chunk: &Chunk<'_>,
        total: usize,
    ) -> Result<Vec<Value>> {
        let user_content = format!(
            "MODULE: {}\nDESCRIPTION: {}\nCHUNK {} OF {}\n\n{}",
            module.title,
            module.description,
            chunk.index + 1,
            total,
            chunk.text
        );
        let request = GenerationRequest::new(prompts::CHUNK_SYSTEM, user_content)
            .with_schema(prompts::lessons_schema());

        let mut attempt = 1;
        loop {
            let reply = self
                .generator
                .generate(&request)
                .await
                .and_then(|reply| lessons::lesson_entries(&reply).map(<[Value]>::to_vec));

            match reply {
                Ok(values) => return Ok(values),
                Err(e) if attempt < self.config.chunk_max_attempts => {
                    tracing::warn!(
                        module = module_idx,
                        chunk = chunk.index,
                        attempt,
                        "chunk failed, retrying: {e}"
                    );
                    tokio::time::sleep(self.config.chunk_backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
