//! Multi-phase generation for corpora too large for one call.
//!
//! summarize (per video) -> plan (one call) -> expand (per module, chunked,
//! consolidated) -> enrich (per lesson). Every phase degrades on failure
//! instead of aborting; only checkpoint writes are fatal.

use std::path::Path;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use super::{Architect, ModuleExpansion, Persona, lessons, resolve_videos};
use crate::{
    context::{build_summary_context, build_video_context, truncate_chars},
    corpus::CorpusReader,
    error::{Result, SyllabusError},
    generation::GenerationRequest,
    progress::{RunReport, WorkUnit},
    prompts,
    types::{Curriculum, Module, VideoContext},
};

impl Architect {
    pub async fn run_map_reduce(
        &self,
        curriculum_id: &str,
        title: Option<&str>,
        videos: &[VideoContext],
        corpus: &dyn CorpusReader,
        persona: &Persona,
        report: &mut RunReport,
    ) -> Result<Curriculum> {
        let summaries = self.summarize(videos, corpus, report).await;
        let summary_context =
            build_summary_context(summaries.iter().map(|(f, s)| (f.as_str(), s.as_str())));

        let mut curriculum = self
            .plan(curriculum_id, title, &summaries, &summary_context, report)
            .await;
        self.checkpoints.save(&curriculum).await?;

        let targets: Vec<usize> = (0..curriculum.modules.len()).collect();
        self.expand_modules(&mut curriculum, &targets, videos, &summary_context, true, report)
            .await?;

        self.enrich(&mut curriculum, persona, report).await?;
        Ok(curriculum)
    }

    /// One summary per video, in corpus order. Cached summaries are reused and
    /// fresh ones are written back to the corpus.
    async fn summarize(
        &self,
        videos: &[VideoContext],
        corpus: &dyn CorpusReader,
        report: &mut RunReport,
    ) -> Vec<(String, String)> {
        let cached = videos.iter().filter(|v| v.cached_summary().is_some()).count();
        self.progress.status(format!(
            "Summarizing {} videos ({cached} cached)",
            videos.len()
        ));

        let mut summaries: Vec<Option<String>> = vec![None; videos.len()];
        let mut replies = stream::iter(videos.iter().enumerate())
            .map(move |(i, video)| async move {
                match video.cached_summary() {
                    Some(summary) => (i, Ok(summary.to_string()), false),
                    None => (i, self.summarize_video(video).await, true),
                }
            })
            .buffer_unordered(self.config.summary_concurrency);

        while let Some((i, reply, fresh)) = replies.next().await {
            let video = &videos[i];
            match reply {
                Ok(summary) => {
                    if fresh {
                        if let Err(e) = corpus.save_summary(&video.filename, &summary).await {
                            tracing::warn!(video = %video.filename, "could not cache summary: {e}");
                        }
                    }
                    summaries[i] = Some(summary);
                }
                Err(e) => {
                    report.record(
                        WorkUnit::Summary {
                            video: video.filename.clone(),
                        },
                        e.to_string(),
                    );
                    let block = build_video_context(video, self.config.min_on_screen_chars);
                    summaries[i] =
                        Some(truncate_chars(&block, self.config.fallback_summary_chars).to_string());
                }
            }
        }

        videos
            .iter()
            .zip(summaries)
            .map(|(video, summary)| (video.filename.clone(), summary.unwrap_or_default()))
            .collect()
    }

    async fn summarize_video(&self, video: &VideoContext) -> Result<String> {
        let context = build_video_context(video, self.config.min_on_screen_chars);
        let reply = self
            .generator
            .generate(&GenerationRequest::new(prompts::SUMMARY_SYSTEM, context))
            .await?;

        let summary = match &reply {
            Value::String(text) => Some(text.as_str()),
            other => other.get("summary").and_then(Value::as_str),
        };
        match summary.map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(SyllabusError::InvalidResponse {
                reason: "summary reply has no \"summary\" text".to_string(),
            }),
        }
    }

    /// The curriculum skeleton. If planning fails, every video becomes its own
    /// module.
    async fn plan(
        &self,
        curriculum_id: &str,
        title: Option<&str>,
        summaries: &[(String, String)],
        summary_context: &str,
        report: &mut RunReport,
    ) -> Curriculum {
        self.progress.status("Planning modules");

        let request = GenerationRequest::new(prompts::PLAN_SYSTEM, summary_context)
            .with_schema(prompts::plan_schema());
        let planned = match self.generator.generate(&request).await {
            Ok(reply) => lessons::curriculum_parts(&reply),
            Err(e) => Err(e),
        };

        let (generated_title, description, mut modules) = match planned {
            Ok(parts) => parts,
            Err(e) => {
                report.record(WorkUnit::Plan, e.to_string());
                let modules = summaries
                    .iter()
                    .map(|(filename, summary)| Module {
                        title: video_title(filename),
                        description: truncate_chars(summary, 280).to_string(),
                        recommended_source_videos: vec![filename.clone()],
                        ..Default::default()
                    })
                    .collect();
                ("Untitled curriculum".to_string(), String::new(), modules)
            }
        };
        for module in &mut modules {
            module.lessons.clear();
        }

        self.progress
            .status(format!("Planned {} modules", modules.len()));
        Curriculum {
            id: curriculum_id.to_string(),
            title: title.map(str::to_string).unwrap_or(generated_title),
            description,
            modules,
        }
    }

    /// Expand the modules at `targets` concurrently and write each result back
    /// at its own index. With `checkpoint_each` the curriculum is saved after
    /// every module, otherwise once after all of them.
    pub async fn expand_modules(
        &self,
        curriculum: &mut Curriculum,
        targets: &[usize],
        videos: &[VideoContext],
        summary_context: &str,
        checkpoint_each: bool,
        report: &mut RunReport,
    ) -> Result<()> {
        let total = targets.len();
        self.progress.status(format!("Expanding {total} modules"));

        let jobs: Vec<(usize, Module)> = targets
            .iter()
            .map(|&idx| (idx, curriculum.modules[idx].clone()))
            .collect();
        let mut finished = stream::iter(jobs)
            .map(move |(idx, module)| async move {
                let expansion = self
                    .expand_planned_module(idx, &module, videos, summary_context)
                    .await;
                (idx, expansion)
            })
            .buffer_unordered(self.config.module_concurrency);

        let mut done = 0;
        while let Some((idx, expansion)) = finished.next().await {
            let module = &mut curriculum.modules[idx];
            report.extend(expansion.apply_to(idx, module));
            done += 1;

            let outcome = match &module.error {
                Some(reason) => format!("failed ({reason})"),
                None => format!("{} lessons", module.lessons.len()),
            };
            self.progress.status(format!(
                "Module {done}/{total} {}: {outcome}",
                module.title
            ));

            if checkpoint_each {
                self.checkpoints.save(curriculum).await?;
            }
        }
        if !checkpoint_each {
            self.checkpoints.save(curriculum).await?;
        }
        Ok(())
    }

    /// Resolve the module's videos, expand it from their context (or from the
    /// summaries when none resolve or none has speech or on-screen text), then
    /// consolidate.
    async fn expand_planned_module(
        &self,
        idx: usize,
        module: &Module,
        videos: &[VideoContext],
        summary_context: &str,
    ) -> ModuleExpansion {
        let mut report = RunReport::default();
        let (resolved, missing) = resolve_videos(&module.recommended_source_videos, videos);
        for video in missing {
            report.record(
                WorkUnit::MissingVideo { module: idx, video },
                "recommended video is not in the corpus",
            );
        }

        let min_chars = self.config.min_on_screen_chars;
        let sources: Vec<&VideoContext> = resolved
            .into_iter()
            .filter(|video| video.has_content(min_chars))
            .collect();
        let context = if sources.is_empty() {
            summary_context.to_string()
        } else {
            sources
                .iter()
                .map(|video| build_video_context(video, min_chars))
                .collect()
        };

        let mut expansion = if context.trim().is_empty() {
            ModuleExpansion::failed(idx, "no resolvable source video or summary context")
        } else {
            self.expand_module(idx, module, &context).await
        };

        if !expansion.lessons.is_empty() {
            let lessons = std::mem::take(&mut expansion.lessons);
            expansion.lessons = self
                .consolidate(idx, &module.title, lessons, &mut expansion.report)
                .await;
        }

        report.extend(expansion.report);
        expansion.report = report;
        expansion
    }
}

fn video_title(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
        .replace(['_', '-'], " ")
}
