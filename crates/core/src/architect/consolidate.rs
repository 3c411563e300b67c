//! Merging of fine-grained chunk lessons into fewer coherent ones.

use std::fmt::Write;

use serde::Deserialize;

use super::{Architect, lessons};
use crate::{
    context::truncate_chars,
    error::{Result, SyllabusError},
    generation::GenerationRequest,
    progress::{RunReport, WorkUnit},
    prompts,
    types::{Lesson, LessonStatus},
};

const EXCERPT_CHARS: usize = 280;

/// One merged lesson as proposed by the model, referencing the micro-lessons
/// it absorbs by index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonGroup {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub learning_objective: String,
    #[serde(default)]
    pub source_indices: Vec<i64>,
}

/// Merge `lessons` according to `groups`. Scripts are joined with a blank line
/// and clips are concatenated (duplicates kept). A group with a failed member
/// stays failed and carries the members' errors. Out-of-range indices are
/// ignored, groups left with no member are skipped, and lessons no group
/// references are appended afterwards in their original order.
pub fn merge_groups(lessons: &[Lesson], groups: &[LessonGroup]) -> Vec<Lesson> {
    let mut referenced = vec![false; lessons.len()];
    let mut merged = Vec::with_capacity(groups.len());

    for group in groups {
        let mut members: Vec<usize> = Vec::new();
        for &index in &group.source_indices {
            let Ok(index) = usize::try_from(index) else {
                continue;
            };
            if index < lessons.len() && !members.contains(&index) {
                members.push(index);
            }
        }
        let Some(&first) = members.first() else {
            continue;
        };

        let voiceover_script = members
            .iter()
            .map(|&i| lessons[i].voiceover_script.trim())
            .filter(|script| !script.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let source_clips = members
            .iter()
            .flat_map(|&i| lessons[i].source_clips.iter().cloned())
            .collect();
        let mut errors: Vec<&str> = Vec::new();
        for &i in &members {
            referenced[i] = true;
            if let Some(error) = lessons[i].error.as_deref() {
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
        }
        let failed = members
            .iter()
            .any(|&i| lessons[i].status == LessonStatus::Failed);

        merged.push(Lesson {
            title: non_empty_or(&group.title, &lessons[first].title),
            learning_objective: non_empty_or(
                &group.learning_objective,
                &lessons[first].learning_objective,
            ),
            voiceover_script,
            source_clips,
            status: if failed {
                LessonStatus::Failed
            } else {
                LessonStatus::Complete
            },
            error: (!errors.is_empty()).then(|| errors.join("; ")),
            ..Default::default()
        });
    }

    merged.extend(
        lessons
            .iter()
            .zip(&referenced)
            .filter(|(_, seen)| !**seen)
            .map(|(lesson, _)| lesson.clone()),
    );
    merged
}

fn non_empty_or(preferred: &str, fallback: &str) -> String {
    if preferred.trim().is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}

impl Architect {
    /// Consolidate a module's lessons when there are more than the configured
    /// threshold. Any failure keeps the list as it came in.
    pub async fn consolidate(
        &self,
        module_idx: usize,
        module_title: &str,
        lessons: Vec<Lesson>,
        report: &mut RunReport,
    ) -> Vec<Lesson> {
        if lessons.len() <= self.config.consolidation_threshold {
            return lessons;
        }

        match self.request_groups(module_title, &lessons).await {
            Ok(groups) => {
                let merged = merge_groups(&lessons, &groups);
                tracing::info!(
                    module = module_idx,
                    before = lessons.len(),
                    after = merged.len(),
                    "consolidated lessons"
                );
                merged
            }
            Err(e) => {
                report.record(WorkUnit::Consolidation { module: module_idx }, e.to_string());
                lessons
            }
        }
    }

    async fn request_groups(&self, module_title: &str, lessons: &[Lesson]) -> Result<Vec<LessonGroup>> {
        let mut listing = format!("MODULE: {module_title}\n\n");
        for (i, lesson) in lessons.iter().enumerate() {
            let excerpt = truncate_chars(lesson.voiceover_script.trim(), EXCERPT_CHARS);
            let _ = writeln!(listing, "[{i}] {}: {}", lesson.title, excerpt.replace('\n', " "));
        }

        let system = prompts::consolidate_system(
            self.config.consolidation_min_lessons,
            self.config.consolidation_max_lessons,
        );
        let reply = self
            .generator
            .generate(&GenerationRequest::new(system, listing))
            .await?;

        let groups: Vec<LessonGroup> = lessons::lesson_entries(&reply)?
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .filter(|group: &LessonGroup| !group.source_indices.is_empty())
            .collect();
        if groups.is_empty() {
            return Err(SyllabusError::InvalidResponse {
                reason: "consolidation returned no lesson groups".to_string(),
            });
        }
        Ok(groups)
    }
}
