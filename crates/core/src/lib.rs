pub mod align;
pub mod architect;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod corpus;
pub mod error;
pub mod format;
pub mod generation;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod repair;
pub mod strategy;
pub mod types;

pub use align::{TimelineAligner, align};
pub use checkpoint::{CheckpointHandle, CheckpointStore, CheckpointWriter, JsonFileStore, MemoryStore};
pub use config::Config;
pub use corpus::{CorpusReader, JsonDirCorpus};
pub use error::{Result, SyllabusError};
pub use format::{format_curriculum_readable, format_timestamp};
pub use generation::{ChatCompletionsGenerator, GenerationRequest, Generator};
pub use pipeline::{CurriculumPipeline, SynthesisRequest};
pub use progress::{ProgressEvent, ProgressSink, RunOutcome, RunReport, UnitFailure, WorkUnit};
pub use provider::{Provider, ProviderConfig};
pub use repair::{RepairEngine, RepairPhases};
pub use strategy::{Strategy, select_strategy};
pub use types::{Curriculum, Lesson, LessonStatus, Module, SourceClip, StepSegment, VideoContext, WordTimestamp};
