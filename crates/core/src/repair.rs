//! Targeted re-runs over a persisted curriculum.
//!
//! Only modules that are empty or carry an error are re-expanded, and only
//! lessons that are not fully enriched are re-enriched. Everything else in the
//! document is left exactly as it was loaded.

use std::sync::Arc;

use crate::{
    architect::Architect,
    checkpoint::CheckpointHandle,
    config::Config,
    context::build_summary_context,
    corpus::CorpusReader,
    error::{Result, SyllabusError},
    generation::Generator,
    progress::{ProgressSink, RunOutcome, RunReport},
    types::Curriculum,
};

/// Which phases a repair run re-attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairPhases {
    pub expansion: bool,
    pub enrichment: bool,
}

impl RepairPhases {
    pub fn all() -> Self {
        Self {
            expansion: true,
            enrichment: true,
        }
    }

    pub fn expansion() -> Self {
        Self {
            expansion: true,
            enrichment: false,
        }
    }

    pub fn enrichment() -> Self {
        Self {
            expansion: false,
            enrichment: true,
        }
    }
}

pub struct RepairEngine {
    generator: Arc<dyn Generator>,
    corpus: Arc<dyn CorpusReader>,
    checkpoints: CheckpointHandle,
    config: Config,
}

impl RepairEngine {
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

    pub async fn repair(
        &self,
        curriculum_id: &str,
        phases: RepairPhases,
        progress: &ProgressSink,
    ) -> Result<RunOutcome> {
        let curriculum = self.checkpoints.load(curriculum_id).await?.ok_or_else(|| {
            SyllabusError::CurriculumNotFound {
                curriculum_id: curriculum_id.to_string(),
            }
        })?;
        self.resume(curriculum, phases, progress).await
    }

    /// Run `phases` over an already loaded curriculum.
    pub async fn resume(
        &self,
        mut curriculum: Curriculum,
        phases: RepairPhases,
        progress: &ProgressSink,
    ) -> Result<RunOutcome> {
        tracing::info!(curriculum_id = %curriculum.id, ?phases, "repair started");

        let architect = Architect::new(
            self.generator.clone(),
            self.checkpoints.clone(),
            self.config.synthesis.clone(),
            progress.clone(),
        );
        let mut report = RunReport::default();

        if phases.expansion {
            self.repair_expansion(&architect, &mut curriculum, &mut report)
                .await?;
        }
        if phases.enrichment {
            self.repair_enrichment(&architect, &mut curriculum, &mut report)
                .await?;
        }

        let outcome = RunOutcome {
            curriculum_id: curriculum.id.clone(),
            strategy: None,
            modules: curriculum.modules.len(),
            lessons: curriculum.lesson_count(),
            report,
        };
        progress.result(outcome.clone());
        Ok(outcome)
    }

    async fn repair_expansion(
        &self,
        architect: &Architect,
        curriculum: &mut Curriculum,
        report: &mut RunReport,
    ) -> Result<()> {
        let targets: Vec<usize> = curriculum
            .modules
            .iter()
            .enumerate()
            .filter(|(_, module)| module.needs_expansion())
            .map(|(idx, _)| idx)
            .collect();
        if targets.is_empty() {
            architect.progress().status("No modules need expansion");
            return Ok(());
        }

        let videos = self.corpus.list_videos().await?;
        let summary_context = build_summary_context(
            videos
                .iter()
                .filter_map(|v| v.cached_summary().map(|s| (v.filename.as_str(), s))),
        );

        architect
            .progress()
            .status(format!("Repairing {} modules", targets.len()));
        architect
            .expand_modules(curriculum, &targets, &videos, &summary_context, false, report)
            .await
    }

    async fn repair_enrichment(
        &self,
        architect: &Architect,
        curriculum: &mut Curriculum,
        report: &mut RunReport,
    ) -> Result<()> {
        if curriculum.lesson_count() == 0 {
            architect
                .progress()
                .status("No lessons to enrich yet; run expansion repair first");
            return Ok(());
        }

        let videos = self.corpus.list_videos().await?;
        let persona = architect.detect_persona(&videos, report).await;
        let enriched = architect.enrich(curriculum, &persona, report).await?;
        if enriched == 0 {
            architect.progress().status("Every lesson is already enriched");
        }
        Ok(())
    }
}
