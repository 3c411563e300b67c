//! Conversion of loosely shaped model output into typed lessons and modules.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{Result, SyllabusError},
    types::{Lesson, LessonStatus, Module, SourceClip},
};

#[derive(Deserialize)]
struct RawLesson {
    #[serde(default)]
    title: String,
    #[serde(default)]
    learning_objective: String,
    #[serde(default)]
    voiceover_script: String,
    #[serde(default)]
    source_clips: Vec<Value>,
}

#[derive(Deserialize)]
struct RawModule {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    recommended_source_videos: Vec<String>,
    #[serde(default)]
    lessons: Vec<Value>,
}

/// The lesson array of a reply shaped either `{"lessons": [...]}` or `[...]`.
pub fn lesson_entries(reply: &Value) -> Result<&[Value]> {
    match reply {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match map.get("lessons") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SyllabusError::InvalidResponse {
                reason: "reply has no \"lessons\" array".to_string(),
            }),
        },
        _ => Err(SyllabusError::InvalidResponse {
            reason: format!("expected lessons, got {}", kind(reply)),
        }),
    }
}

/// A completed lesson from one reply entry. Entries that are not lesson
/// objects become a failed placeholder carrying the raw payload.
pub fn lesson_from_value(value: &Value, ordinal: usize) -> Lesson {
    let raw = match value {
        Value::Object(_) => serde_json::from_value::<RawLesson>(value.clone()).ok(),
        _ => None,
    };
    let Some(raw) = raw else {
        return recovered_lesson(value, ordinal);
    };

    let source_clips = raw
        .source_clips
        .into_iter()
        .filter_map(|clip| match serde_json::from_value::<SourceClip>(clip) {
            Ok(clip) => Some(clip),
            Err(e) => {
                tracing::debug!(lesson = ordinal, "dropping clip: {e}");
                None
            }
        })
        .collect();

    let title = if raw.title.trim().is_empty() {
        format!("Lesson {}", ordinal + 1)
    } else {
        raw.title
    };

    Lesson {
        title,
        voiceover_script: raw.voiceover_script,
        learning_objective: raw.learning_objective,
        source_clips,
        status: LessonStatus::Complete,
        ..Default::default()
    }
}

fn recovered_lesson(value: &Value, ordinal: usize) -> Lesson {
    let script = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Lesson {
        title: format!("Recovered lesson {}", ordinal + 1),
        voiceover_script: script,
        status: LessonStatus::Failed,
        error: Some("malformed lesson payload".to_string()),
        ..Default::default()
    }
}

pub fn lessons_from_values(values: &[Value]) -> Vec<Lesson> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| lesson_from_value(v, i))
        .collect()
}

/// A module skeleton (no lessons yet) from one planning entry.
pub fn module_from_value(value: &Value) -> Result<Module> {
    let raw: RawModule = serde_json::from_value(value.clone())?;
    Ok(Module {
        title: raw.title,
        description: raw.description,
        recommended_source_videos: raw.recommended_source_videos,
        lessons: lessons_from_values(&raw.lessons),
        error: None,
    })
}

/// Title, description and modules of a curriculum-shaped reply.
pub fn curriculum_parts(reply: &Value) -> Result<(String, String, Vec<Module>)> {
    let modules = reply
        .get("modules")
        .and_then(Value::as_array)
        .ok_or_else(|| SyllabusError::InvalidResponse {
            reason: "reply has no \"modules\" array".to_string(),
        })?;

    let modules = modules
        .iter()
        .map(module_from_value)
        .collect::<Result<Vec<_>>>()?;
    if modules.is_empty() {
        return Err(SyllabusError::InvalidResponse {
            reason: "reply planned no modules".to_string(),
        });
    }

    let text = |key: &str| {
        reply
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Ok((text("title"), text("description"), modules))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_wrapped_and_bare_lesson_arrays() {
        let wrapped = json!({"lessons": [{"title": "A"}]});
        let bare = json!([{"title": "A"}, {"title": "B"}]);

        assert_eq!(lesson_entries(&wrapped).unwrap().len(), 1);
        assert_eq!(lesson_entries(&bare).unwrap().len(), 2);
        assert!(lesson_entries(&json!({"modules": []})).is_err());
        assert!(lesson_entries(&json!("nope")).is_err());
    }

    #[test]
    fn invalid_clips_are_dropped_not_the_lesson() {
        let lesson = lesson_from_value(
            &json!({
                "title": "Export a report",
                "voiceover_script": "Open reports...",
                "source_clips": [
                    {"video_filename": "r.mp4", "start_time": 10.0, "end_time": 20.0, "reason": "demo"},
                    {"video_filename": "r.mp4", "start_time": 30.0, "end_time": 25.0},
                    "not a clip"
                ]
            }),
            0,
        );

        assert_eq!(lesson.status, LessonStatus::Complete);
        assert_eq!(lesson.source_clips.len(), 1);
        assert_eq!(lesson.source_clips[0].end_time, 20.0);
    }

    #[test]
    fn non_object_entries_become_recovered_lessons() {
        let lessons = lessons_from_values(&[json!("Just a sentence"), json!(42), json!({"title": 7})]);

        assert_eq!(lessons.len(), 3);
        assert_eq!(lessons[0].title, "Recovered lesson 1");
        assert_eq!(lessons[0].voiceover_script, "Just a sentence");
        assert_eq!(lessons[1].voiceover_script, "42");
        assert!(lessons.iter().all(|l| l.status == LessonStatus::Failed));
        assert!(lessons.iter().all(|l| l.error.is_some()));
    }

    #[test]
    fn untitled_lessons_get_a_positional_title() {
        let lesson = lesson_from_value(&json!({"voiceover_script": "x"}), 4);
        assert_eq!(lesson.title, "Lesson 5");
    }

    #[test]
    fn curriculum_reply_requires_modules() {
        let (title, _, modules) = curriculum_parts(&json!({
            "title": "Ops",
            "modules": [{"title": "M1", "recommended_source_videos": ["a.mp4"]}]
        }))
        .unwrap();
        assert_eq!(title, "Ops");
        assert_eq!(modules[0].recommended_source_videos, ["a.mp4"]);
        assert!(modules[0].lessons.is_empty());

        assert!(curriculum_parts(&json!({"title": "Ops", "modules": []})).is_err());
        assert!(curriculum_parts(&json!({"title": "Ops"})).is_err());
    }
}
