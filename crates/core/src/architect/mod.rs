//! Curriculum generation strategies and the units of work they share.
//!
//! [`Architect`] holds the collaborators every phase needs. Its methods are
//! spread over the submodules: `direct` and `map_reduce` are the two
//! strategies, `chunking`, `consolidate` and `enrich` are the per-module and
//! per-lesson units reused by both strategies and by repair.

use std::sync::Arc;

use crate::{
    checkpoint::CheckpointHandle, config::SynthesisConfig, generation::Generator,
    progress::ProgressSink, types::VideoContext,
};

pub mod chunking;
pub mod consolidate;
pub mod direct;
pub mod enrich;
pub mod lessons;
pub mod map_reduce;

pub use chunking::{Chunk, ModuleExpansion, split_into_chunks};
pub use consolidate::{LessonGroup, merge_groups};
pub use enrich::Persona;

pub struct Architect {
    generator: Arc<dyn Generator>,
    checkpoints: CheckpointHandle,
    config: SynthesisConfig,
    progress: ProgressSink,
}

impl Architect {
    pub fn new(
        generator: Arc<dyn Generator>,
        checkpoints: CheckpointHandle,
        config: SynthesisConfig,
        progress: ProgressSink,
    ) -> Self {
        Self {
            generator,
            checkpoints,
            config,
            progress,
        }
    }

    pub fn progress(&self) -> &ProgressSink {
        &self.progress
    }
}

/// Match a module's requested filenames against the corpus: exact name first,
/// then whitespace-trimmed. Returns the resolved videos and the names that
/// matched nothing.
pub fn resolve_videos<'a>(
    requested: &[String],
    videos: &'a [VideoContext],
) -> (Vec<&'a VideoContext>, Vec<String>) {
    let mut resolved: Vec<&VideoContext> = Vec::new();
    let mut missing = Vec::new();

    for name in requested {
        let found = videos
            .iter()
            .find(|v| v.filename == *name)
            .or_else(|| videos.iter().find(|v| v.filename.trim() == name.trim()));
        match found {
            Some(video) if !resolved.iter().any(|r| std::ptr::eq(*r, video)) => {
                resolved.push(video)
            }
            Some(_) => {}
            None => missing.push(name.clone()),
        }
    }

    (resolved, missing)
}
