use std::sync::Arc;

use crate::{
    architect::Architect,
    checkpoint::CheckpointHandle,
    config::Config,
    context::build_context,
    corpus::CorpusReader,
    error::{Result, SyllabusError},
    generation::Generator,
    progress::{ProgressSink, RunOutcome, RunReport},
    repair::{RepairEngine, RepairPhases},
    strategy::{Strategy, select_strategy},
};

#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    /// Id to checkpoint under; a new one is generated when absent.
    pub curriculum_id: Option<String>,
    /// Overrides the generated title.
    pub title: Option<String>,
}

/// End-to-end curriculum synthesis over a corpus.
pub struct CurriculumPipeline {
    generator: Arc<dyn Generator>,
    corpus: Arc<dyn CorpusReader>,
    checkpoints: CheckpointHandle,
    config: Config,
}

impl CurriculumPipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        corpus: Arc<dyn CorpusReader>,
        checkpoints: CheckpointHandle,
        config: Config,
    ) -> Self {
        Self {
            generator,
            corpus,
            checkpoints,
            config,
        }
    }

    pub async fn run(
        &self,
        request: &SynthesisRequest,
        progress: &ProgressSink,
    ) -> Result<RunOutcome> {
        let curriculum_id = request
            .curriculum_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let title = request.title.as_deref();

        // A saved curriculum is never regenerated from scratch; only its
        // unfinished modules and lessons are re-run.
        if let Some(existing) = self.checkpoints.load(&curriculum_id).await? {
            tracing::info!(curriculum_id = %curriculum_id, "resuming saved curriculum");
            progress.status(format!(
                "Curriculum {curriculum_id} already exists, resuming unfinished work"
            ));
            let engine = RepairEngine::new(
                self.generator.clone(),
                self.corpus.clone(),
                self.checkpoints.clone(),
                self.config.clone(),
            );
            return engine.resume(existing, RepairPhases::all(), progress).await;
        }

        let videos = self.corpus.list_videos().await?;
        if videos.is_empty() {
            return Err(SyllabusError::EmptyCorpus);
        }
        progress.status(format!("Loaded {} videos", videos.len()));

        let synthesis = &self.config.synthesis;
        let context = build_context(&videos, synthesis.min_on_screen_chars);
        let context_chars = context.chars().count();
        let mut strategy = select_strategy(context_chars, synthesis.direct_threshold_chars);
        tracing::info!(
            curriculum_id = %curriculum_id,
            context_chars,
            strategy = strategy.name(),
            "strategy selected"
        );

        let architect = Architect::new(
            self.generator.clone(),
            self.checkpoints.clone(),
            synthesis.clone(),
            progress.clone(),
        );
        let mut report = RunReport::default();
        let persona = architect.detect_persona(&videos, &mut report).await;

        let direct = match strategy {
            Strategy::Direct => {
                architect
                    .run_direct(&curriculum_id, title, &context, &persona, &mut report)
                    .await?
            }
            Strategy::MapReduce => None,
        };
        let curriculum = match direct {
            Some(curriculum) => curriculum,
            None => {
                if strategy == Strategy::Direct {
                    progress.status("Single-pass generation failed, switching to map-reduce");
                    strategy = Strategy::MapReduce;
                }
                architect
                    .run_map_reduce(
                        &curriculum_id,
                        title,
                        &videos,
                        self.corpus.as_ref(),
                        &persona,
                        &mut report,
                    )
                    .await?
            }
        };

        let outcome = RunOutcome {
            curriculum_id,
            strategy: Some(strategy),
            modules: curriculum.modules.len(),
            lessons: curriculum.lesson_count(),
            report,
        };
        tracing::info!(
            curriculum_id = %outcome.curriculum_id,
            modules = outcome.modules,
            lessons = outcome.lessons,
            failures = outcome.report.failures.len(),
            "synthesis finished"
        );
        progress.result(outcome.clone());
        Ok(outcome)
    }
}
