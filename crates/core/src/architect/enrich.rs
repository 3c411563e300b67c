//! Per-lesson enrichment: practical guidance and a quiz, written against a
//! persona detected once per run.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Architect;
use crate::{
    context::{build_video_context, truncate_chars},
    error::{Result, SyllabusError},
    generation::GenerationRequest,
    progress::{RunReport, WorkUnit},
    prompts,
    types::{Curriculum, Lesson, VideoContext},
};

/// Who teaches whom, shared by every enrichment call of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    pub instructor_role: String,
    pub student_role: String,
    pub domain: String,
    pub quiz_focus_areas: Vec<String>,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            instructor_role: "Experienced practitioner".to_string(),
            student_role: "New team member".to_string(),
            domain: "Workplace training".to_string(),
            quiz_focus_areas: vec!["Key procedures".to_string()],
        }
    }
}

impl Persona {
    fn describe(&self) -> String {
        format!(
            "Instructor: {}\nStudent: {}\nDomain: {}\nQuiz focus areas: {}",
            self.instructor_role,
            self.student_role,
            self.domain,
            self.quiz_focus_areas.join(", ")
        )
    }
}

type FieldReply = Option<Result<Map<String, Value>>>;

impl Architect {
    /// Detect the persona from the first few videos. Falls back to
    /// [`Persona::default`] on any failure.
    pub async fn detect_persona(&self, videos: &[VideoContext], report: &mut RunReport) -> Persona {
        if videos.is_empty() {
            return Persona::default();
        }

        let sample = videos
            .iter()
            .take(self.config.persona_sample_videos)
            .map(|video| {
                let block = build_video_context(video, self.config.min_on_screen_chars);
                truncate_chars(&block, self.config.persona_sample_chars).to_string()
            })
            .collect::<Vec<_>>()
            .join("\n");

        let detected = self
            .generator
            .generate(&GenerationRequest::new(prompts::PERSONA_SYSTEM, sample))
            .await
            .and_then(|reply| Ok(serde_json::from_value::<Persona>(reply)?));

        match detected {
            Ok(persona) => {
                tracing::info!(domain = %persona.domain, "persona detected");
                persona
            }
            Err(e) => {
                report.record(WorkUnit::Persona, e.to_string());
                Persona::default()
            }
        }
    }

    /// Enrich every lesson that is not enriched yet. Progress is checkpointed
    /// every `enrichment_batch_size` lessons and once at the end. Returns the
    /// number of lessons processed; only a checkpoint failure is an error.
    pub async fn enrich(
        &self,
        curriculum: &mut Curriculum,
        persona: &Persona,
        report: &mut RunReport,
    ) -> Result<usize> {
        let targets: Vec<(usize, usize, Lesson)> = curriculum
            .modules
            .iter()
            .enumerate()
            .flat_map(|(m, module)| {
                module
                    .lessons
                    .iter()
                    .enumerate()
                    .filter(|(_, lesson)| !lesson.is_enriched())
                    .map(move |(l, lesson)| (m, l, lesson.clone()))
            })
            .collect();
        if targets.is_empty() {
            tracing::debug!("every lesson is already enriched");
            return Ok(0);
        }

        let total = targets.len();
        self.progress.status(format!("Enriching {total} lessons"));
        let persona = persona.describe();
        let persona = persona.as_str();

        let mut replies = stream::iter(targets)
            .map(move |(m, l, lesson)| async move {
                let (smart_context, quiz) = tokio::join!(
                    self.enrich_field(
                        lesson.smart_context.is_empty(),
                        prompts::SMART_CONTEXT_SYSTEM,
                        persona,
                        &lesson
                    ),
                    self.enrich_field(lesson.quiz.is_empty(), prompts::QUIZ_SYSTEM, persona, &lesson),
                );
                (m, l, smart_context, quiz)
            })
            .buffer_unordered(self.config.enrichment_concurrency);

        let batch = self.config.enrichment_batch_size;
        let mut done = 0;
        while let Some((m, l, smart_context, quiz)) = replies.next().await {
            let lesson = &mut curriculum.modules[m].lessons[l];
            let mut errors = Vec::new();
            for (reply, field) in [(smart_context, &mut lesson.smart_context), (quiz, &mut lesson.quiz)] {
                match reply {
                    Some(Ok(value)) => *field = value,
                    Some(Err(e)) => errors.push(e.to_string()),
                    None => {}
                }
            }
            if !errors.is_empty() {
                report.record(WorkUnit::LessonEnrichment { module: m, lesson: l }, errors.join("; "));
            }

            done += 1;
            if done % batch == 0 {
                self.checkpoints.save(curriculum).await?;
                self.progress.status(format!("Enriched {done}/{total} lessons"));
            }
        }
        if done % batch != 0 {
            self.checkpoints.save(curriculum).await?;
            self.progress.status(format!("Enriched {done}/{total} lessons"));
        }

        Ok(done)
    }

    async fn enrich_field(
        &self,
        needed: bool,
        system_prompt: &str,
        persona: &str,
        lesson: &Lesson,
    ) -> FieldReply {
        if !needed {
            return None;
        }
        let user_content = format!(
            "PERSONA:\n{persona}\n\nLESSON: {}\nOBJECTIVE: {}\nSCRIPT:\n{}",
            lesson.title, lesson.learning_objective, lesson.voiceover_script
        );
        let reply = self
            .generator
            .generate(&GenerationRequest::new(system_prompt, user_content))
            .await;

        Some(reply.and_then(|value| match value {
            Value::Object(map) => Ok(map),
            other => Err(SyllabusError::InvalidResponse {
                reason: format!("expected an object, got {other}"),
            }),
        }))
    }
}
