use crate::types::{Curriculum, LessonStatus};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format a curriculum as a human-readable markdown outline
pub fn format_curriculum_readable(curriculum: &Curriculum) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", curriculum.title));
    if !curriculum.description.is_empty() {
        output.push_str(&curriculum.description);
        output.push_str("\n\n");
    }
    output.push_str(&format!(
        "**Modules:** {} | **Lessons:** {}\n\n",
        curriculum.modules.len(),
        curriculum.lesson_count()
    ));

    for (m, module) in curriculum.modules.iter().enumerate() {
        output.push_str(&format!("## {}. {}\n\n", m + 1, module.title));
        if let Some(error) = &module.error {
            output.push_str(&format!("> ⚠ {}\n\n", error));
        }
        if !module.description.is_empty() {
            output.push_str(&format!("{}\n\n", module.description));
        }

        for (l, lesson) in module.lessons.iter().enumerate() {
            let marker = match lesson.status {
                LessonStatus::Complete => "",
                LessonStatus::Pending => " (pending)",
                LessonStatus::Failed => " (failed)",
            };
            output.push_str(&format!("### {}.{} {}{}\n\n", m + 1, l + 1, lesson.title, marker));
            if !lesson.learning_objective.is_empty() {
                output.push_str(&format!("*{}*\n\n", lesson.learning_objective));
            }
            for clip in &lesson.source_clips {
                output.push_str(&format!(
                    "• {} [{}–{}] {}\n",
                    clip.video_filename,
                    format_timestamp(clip.start_time),
                    format_timestamp(clip.end_time),
                    clip.reason
                ));
            }
            if !lesson.source_clips.is_empty() {
                output.push('\n');
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Lesson, Module, SourceClip};

    #[test]
    fn timestamps_are_minutes_and_seconds() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(125.9), "02:05");
        assert_eq!(format_timestamp(-3.0), "00:00");
    }

    #[test]
    fn outline_lists_modules_lessons_and_clips() {
        let curriculum = Curriculum {
            id: "c1".into(),
            title: "Billing Admin".into(),
            description: String::new(),
            modules: vec![Module {
                title: "Invoices".into(),
                error: Some("expansion failed".into()),
                lessons: vec![Lesson {
                    title: "Create an invoice".into(),
                    status: LessonStatus::Complete,
                    source_clips: vec![
                        SourceClip::new("billing.mp4", 61.0, 90.0, "walkthrough").unwrap(),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };

        let text = format_curriculum_readable(&curriculum);
        assert!(text.starts_with("# Billing Admin\n"));
        assert!(text.contains("**Modules:** 1 | **Lessons:** 1"));
        assert!(text.contains("## 1. Invoices"));
        assert!(text.contains("> ⚠ expansion failed"));
        assert!(text.contains("### 1.1 Create an invoice\n"));
        assert!(text.contains("• billing.mp4 [01:01–01:30] walkthrough"));
    }
}
