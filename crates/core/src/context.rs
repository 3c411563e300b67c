use std::fmt::Write;

use crate::{format::format_timestamp, types::VideoContext};

/// Serialize videos into the `<VIDEO>` blocks used as generation payload.
///
/// On-screen entries shorter than `min_on_screen_chars` (after trimming) are
/// OCR noise and are dropped.
pub fn build_context(videos: &[VideoContext], min_on_screen_chars: usize) -> String {
    let mut out = String::new();
    for video in videos {
        push_video_block(&mut out, video, min_on_screen_chars);
    }
    out
}

pub fn build_video_context(video: &VideoContext, min_on_screen_chars: usize) -> String {
    let mut out = String::new();
    push_video_block(&mut out, video, min_on_screen_chars);
    out
}

fn push_video_block(out: &mut String, video: &VideoContext, min_on_screen_chars: usize) {
    let _ = writeln!(
        out,
        "<VIDEO filename=\"{}\" duration=\"{:.1}\">",
        video.filename, video.duration
    );

    out.push_str("<SPEECH>\n");
    for entry in &video.transcript.segments {
        let text = entry.text().trim();
        if text.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[{}] {}", format_timestamp(entry.start()), text);
    }
    out.push_str("</SPEECH>\n");

    out.push_str("<ON_SCREEN>\n");
    for event in &video.on_screen.events {
        let text = event.text.trim();
        if text.chars().count() < min_on_screen_chars {
            continue;
        }
        let _ = writeln!(out, "[{}] {}", format_timestamp(event.timestamp), text);
    }
    out.push_str("</ON_SCREEN>\n");

    out.push_str("</VIDEO>\n");
}

/// Summary-only blocks, the map-reduce planning payload.
pub fn build_summary_context<'a>(
    summaries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut out = String::new();
    for (filename, summary) in summaries {
        let _ = writeln!(
            out,
            "<VIDEO filename=\"{}\">\n<SUMMARY>\n{}\n</SUMMARY>\n</VIDEO>",
            filename,
            summary.trim()
        );
    }
    out
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
