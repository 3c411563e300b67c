#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};
use syllabus_core::{
    CheckpointHandle, CheckpointWriter, Config, CorpusReader, GenerationRequest, Generator,
    MemoryStore, ProgressEvent, Result, SyllabusError, VideoContext, prompts,
};
use tokio::sync::mpsc;

/// Which kind of call a request is, judged by its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Summary,
    Plan,
    Chunk,
    Consolidate,
    Persona,
    SmartContext,
    Quiz,
}

impl Route {
    pub fn of(request: &GenerationRequest) -> Route {
        let system = request.system_prompt.as_str();
        match system {
            s if s == prompts::DIRECT_SYSTEM => Route::Direct,
            s if s == prompts::SUMMARY_SYSTEM => Route::Summary,
            s if s == prompts::PLAN_SYSTEM => Route::Plan,
            s if s == prompts::CHUNK_SYSTEM => Route::Chunk,
            s if s == prompts::PERSONA_SYSTEM => Route::Persona,
            s if s == prompts::SMART_CONTEXT_SYSTEM => Route::SmartContext,
            s if s == prompts::QUIZ_SYSTEM => Route::Quiz,
            s if s.starts_with("You merge fine-grained") => Route::Consolidate,
            other => panic!("unrouted system prompt: {}", &other[..40.min(other.len())]),
        }
    }
}

type Handler = dyn Fn(Route, &GenerationRequest) -> Result<Value> + Send + Sync;
type Delay = dyn Fn(Route, &GenerationRequest) -> Duration + Send + Sync;

/// Generator fake answering from a closure and recording every call.
pub struct ScriptedGenerator {
    handler: Box<Handler>,
    delay: Option<Box<Delay>>,
    calls: Mutex<Vec<(Route, String)>>,
}

impl ScriptedGenerator {
    pub fn new(
        handler: impl Fn(Route, &GenerationRequest) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every route with [`standard_reply`].
    pub fn standard() -> Self {
        Self::new(standard_reply)
    }

    pub fn with_delay(
        mut self,
        delay: impl Fn(Route, &GenerationRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self, route: Route) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == route)
            .count()
    }

    pub fn user_contents(&self, route: Route) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == route)
            .map(|(_, content)| content.clone())
            .collect()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let route = Route::of(request);
        self.calls
            .lock()
            .unwrap()
            .push((route, request.user_content.clone()));

        if let Some(delay) = &self.delay {
            let wait = delay(route, request);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        (self.handler)(route, request)
    }
}

pub fn fail(reason: &str) -> Result<Value> {
    Err(SyllabusError::Generation {
        reason: reason.to_string(),
    })
}

/// Title from the `MODULE:` line of a chunk or consolidation request.
pub fn module_of(request: &GenerationRequest) -> &str {
    request
        .user_content
        .lines()
        .find_map(|line| line.strip_prefix("MODULE: "))
        .unwrap_or_default()
}

pub fn lesson_json(title: &str, video: &str, start: f64) -> Value {
    json!({
        "title": title,
        "learning_objective": format!("Perform {title}"),
        "voiceover_script": format!("In this lesson: {title}."),
        "source_clips": [
            {"video_filename": video, "start_time": start, "end_time": start + 4.0, "reason": title}
        ]
    })
}

/// One module per fixture video, one lesson per chunk, plus canned persona,
/// guidance and quiz replies.
pub fn standard_reply(route: Route, request: &GenerationRequest) -> Result<Value> {
    match route {
        Route::Summary => Ok(json!({"summary": "Walkthrough of a routine task."})),
        Route::Plan => Ok(json!({
            "title": "Generated curriculum",
            "description": "Everything in the recordings.",
            "modules": [
                {"title": "Intake", "recommended_source_videos": ["intake.mp4"]},
                {"title": "Storage", "recommended_source_videos": ["storage.mp4"]}
            ]
        })),
        Route::Chunk => {
            let module = module_of(request);
            Ok(json!({"lessons": [lesson_json(&format!("{module} basics"), "intake.mp4", 0.0)]}))
        }
        Route::Direct => Ok(json!({
            "title": "Direct curriculum",
            "description": "Single pass.",
            "modules": [{
                "title": "Everything",
                "recommended_source_videos": ["intake.mp4"],
                "lessons": [lesson_json("Receive a pallet", "intake.mp4", 0.0)]
            }]
        })),
        Route::Persona => Ok(json!({
            "instructor_role": "Shift lead",
            "student_role": "Warehouse associate",
            "domain": "Warehouse operations",
            "quiz_focus_areas": ["Safety"]
        })),
        Route::SmartContext => Ok(json!({"pro_tips": ["Scan before you lift"]})),
        Route::Quiz => Ok(json!({
            "questions": [{"question": "First step?", "options": ["Scan", "Lift"], "correct_index": 0}]
        })),
        Route::Consolidate => fail("no consolidation scripted"),
    }
}

pub fn video(filename: &str, speech: &[&str]) -> VideoContext {
    let segments: Vec<Value> = speech
        .iter()
        .enumerate()
        .map(|(i, text)| json!({"start": i as f64 * 5.0, "end": i as f64 * 5.0 + 5.0, "text": text}))
        .collect();
    serde_json::from_value(json!({
        "filename": filename,
        "duration": speech.len() as f64 * 5.0,
        "transcript": {"segments": segments},
        "on_screen": {"events": [{"timestamp": 1.0, "text": "Receiving dock"}]}
    }))
    .unwrap()
}

pub fn warehouse_videos() -> Vec<VideoContext> {
    vec![
        video("intake.mp4", &["Scan the pallet label", "Check the count"]),
        video("storage.mp4", &["Pick a free slot", "Confirm the location"]),
    ]
}

/// In-memory corpus that records cached summaries.
pub struct FixtureCorpus {
    videos: Mutex<Vec<VideoContext>>,
}

impl FixtureCorpus {
    pub fn new(videos: Vec<VideoContext>) -> Self {
        Self {
            videos: Mutex::new(videos),
        }
    }

    pub fn summary_of(&self, filename: &str) -> Option<String> {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.filename == filename)
            .and_then(|v| v.summary.clone())
    }
}

#[async_trait]
impl CorpusReader for FixtureCorpus {
    async fn list_videos(&self) -> Result<Vec<VideoContext>> {
        Ok(self.videos.lock().unwrap().clone())
    }

    async fn save_summary(&self, filename: &str, summary: &str) -> Result<()> {
        let mut videos = self.videos.lock().unwrap();
        let video = videos
            .iter_mut()
            .find(|v| v.filename == filename)
            .ok_or_else(|| SyllabusError::Generation {
                reason: format!("unknown video {filename}"),
            })?;
        video.summary = Some(summary.to_string());
        Ok(())
    }
}

/// Defaults with retries that do not wait.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.synthesis.chunk_retry_backoff_ms = 0;
    config
}

/// Like [`test_config`] but every corpus goes through map-reduce.
pub fn map_reduce_config() -> Config {
    let mut config = test_config();
    config.synthesis.direct_threshold_chars = 0;
    config
}

pub fn memory_store() -> (Arc<MemoryStore>, CheckpointHandle) {
    let store = Arc::new(MemoryStore::new());
    let (handle, _task) = CheckpointWriter::spawn(store.clone());
    (store, handle)
}

pub fn drain_statuses(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<String> {
    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::Status { msg } = event {
            statuses.push(msg);
        }
    }
    statuses
}
