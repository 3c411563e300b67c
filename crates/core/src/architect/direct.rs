use super::{Architect, Persona, lessons};
use crate::{
    error::Result,
    generation::GenerationRequest,
    progress::{RunReport, WorkUnit},
    prompts,
    types::Curriculum,
};

impl Architect {
    /// Single-call generation over the whole corpus context.
    ///
    /// Returns `Ok(None)` when the call or its reply is unusable, after
    /// recording a [`WorkUnit::Direct`] failure, so the caller can fall back to
    /// map-reduce. The skeleton is checkpointed before enrichment starts.
    pub async fn run_direct(
        &self,
        curriculum_id: &str,
        title: Option<&str>,
        context: &str,
        persona: &Persona,
        report: &mut RunReport,
    ) -> Result<Option<Curriculum>> {
        self.progress.status("Generating curriculum in one pass");

        let request = GenerationRequest::new(prompts::DIRECT_SYSTEM, context);
        let parts = match self.generator.generate(&request).await {
            Ok(reply) => lessons::curriculum_parts(&reply),
            Err(e) => Err(e),
        };
        let (generated_title, description, modules) = match parts {
            Ok(parts) => parts,
            Err(e) => {
                report.record(WorkUnit::Direct, e.to_string());
                return Ok(None);
            }
        };

        let mut curriculum = Curriculum {
            id: curriculum_id.to_string(),
            title: title.map(str::to_string).unwrap_or(generated_title),
            description,
            modules,
        };
        self.checkpoints.save(&curriculum).await?;
        self.progress.status(format!(
            "Planned {} modules with {} lessons",
            curriculum.modules.len(),
            curriculum.lesson_count()
        ));

        self.enrich(&mut curriculum, persona, report).await?;
        Ok(Some(curriculum))
    }
}
