use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One word of a speech-engine timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// A step of a re-segmented speech block with recovered timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSegment {
    pub index: usize,
    pub text: String,
    pub start_ts: f64,
    pub end_ts: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A speech timeline entry. Corpora carry either word-level or segment-level records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimelineEntry {
    Word(WordTimestamp),
    Segment(Segment),
}

impl TimelineEntry {
    pub fn start(&self) -> f64 {
        match self {
            TimelineEntry::Word(w) => w.start,
            TimelineEntry::Segment(s) => s.start,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TimelineEntry::Word(w) => &w.word,
            TimelineEntry::Segment(s) => &s.text,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnScreenEvent {
    pub timestamp: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnScreen {
    #[serde(default)]
    pub events: Vec<OnScreenEvent>,
}

/// Read-only view of one corpus video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoContext {
    pub filename: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub transcript: Transcript,
    #[serde(default)]
    pub on_screen: OnScreen,
    /// Cached summary from an earlier map-reduce run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl VideoContext {
    pub fn cached_summary(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether the video carries any speech or any on-screen text that
    /// survives the `min_on_screen_chars` noise filter.
    pub fn has_content(&self, min_on_screen_chars: usize) -> bool {
        self.transcript
            .segments
            .iter()
            .any(|entry| !entry.text().trim().is_empty())
            || self
                .on_screen
                .events
                .iter()
                .any(|event| event.text.trim().chars().count() >= min_on_screen_chars.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSourceClip {
    video_filename: String,
    start_time: f64,
    end_time: f64,
    #[serde(default)]
    reason: String,
}

/// A cited span of a corpus video. `end_time > start_time` is enforced on deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSourceClip")]
pub struct SourceClip {
    pub video_filename: String,
    pub start_time: f64,
    pub end_time: f64,
    pub reason: String,
}

impl SourceClip {
    pub fn new(
        video_filename: impl Into<String>,
        start_time: f64,
        end_time: f64,
        reason: impl Into<String>,
    ) -> Result<Self, String> {
        if !(start_time.is_finite() && end_time.is_finite()) || end_time <= start_time {
            return Err(format!(
                "clip end_time ({end_time}) must be greater than start_time ({start_time})"
            ));
        }
        Ok(Self {
            video_filename: video_filename.into(),
            start_time,
            end_time,
            reason: reason.into(),
        })
    }
}

impl TryFrom<RawSourceClip> for SourceClip {
    type Error = String;

    fn try_from(raw: RawSourceClip) -> Result<Self, Self::Error> {
        SourceClip::new(raw.video_filename, raw.start_time, raw.end_time, raw.reason)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    #[default]
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    #[serde(default)]
    pub voiceover_script: String,
    #[serde(default)]
    pub learning_objective: String,
    #[serde(default)]
    pub source_clips: Vec<SourceClip>,
    #[serde(default)]
    pub smart_context: Map<String, Value>,
    #[serde(default)]
    pub quiz: Map<String, Value>,
    #[serde(default)]
    pub status: LessonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Lesson {
    pub fn is_enriched(&self) -> bool {
        !self.smart_context.is_empty() && !self.quiz.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommended_source_videos: Vec<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Module {
    /// Modules with nothing to show or a recorded failure are re-expanded by repair.
    pub fn needs_expansion(&self) -> bool {
        self.lessons.is_empty() || self.error.is_some()
    }
}

/// The checkpointed document. Every save replaces it whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

impl Curriculum {
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}
