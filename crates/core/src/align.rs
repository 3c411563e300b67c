//! Anchor-based recovery of step timestamps against a word-level timeline.
//!
//! Step texts come from an independent re-segmentation of an already
//! transcribed block, so they rarely match the timeline verbatim. Each step is
//! located by its first and last few normalized tokens. A single cursor into
//! the timeline only moves forward, so a later step can never claim words an
//! earlier step already consumed.

use crate::{
    config::AlignerConfig,
    types::{Confidence, StepSegment, WordTimestamp},
};

/// Lowercase alphanumeric tokens of `text`, split on whitespace.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|t| !t.is_empty())
        .collect()
}

fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Align every step against `timeline`. Output order and length match `steps`.
pub fn align<S: AsRef<str>>(
    steps: &[S],
    timeline: &[WordTimestamp],
    config: &AlignerConfig,
) -> Vec<StepSegment> {
    let mut aligner = TimelineAligner::new(timeline, config);
    steps
        .iter()
        .map(|step| aligner.align_step(step.as_ref()))
        .collect()
}

pub struct TimelineAligner<'a> {
    timeline: &'a [WordTimestamp],
    tokens: Vec<String>,
    config: &'a AlignerConfig,
    cursor: usize,
    previous: Option<(f64, f64)>,
    next_index: usize,
}

impl<'a> TimelineAligner<'a> {
    pub fn new(timeline: &'a [WordTimestamp], config: &'a AlignerConfig) -> Self {
        Self {
            timeline,
            tokens: timeline.iter().map(|w| normalize_word(&w.word)).collect(),
            config,
            cursor: 0,
            previous: None,
            next_index: 1,
        }
    }

    /// Position of the first timeline word not yet consumed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn align_step(&mut self, text: &str) -> StepSegment {
        let index = self.next_index;
        self.next_index += 1;

        let step_tokens = normalize_tokens(text);
        let (prev_start, prev_end) = self.previous.unwrap_or((0.0, 0.0));

        if step_tokens.is_empty() {
            let segment = StepSegment {
                index,
                text: text.to_string(),
                start_ts: prev_end,
                end_ts: prev_end,
                confidence: Confidence::Low,
            };
            self.previous = Some((segment.start_ts, segment.end_ts));
            return segment;
        }

        let anchor_len = self.config.anchor_tokens.min(step_tokens.len());
        let start_anchor = &step_tokens[..anchor_len];
        let end_anchor = &step_tokens[step_tokens.len() - anchor_len..];

        let start_match = self.find(start_anchor, self.cursor, self.config.start_search_window);
        let (start_ts, search_from) = match start_match {
            Some(at) => (self.timeline[at].start.max(prev_start), at),
            None => {
                tracing::debug!(step = index, cursor = self.cursor, "start anchor not found");
                (prev_end, self.cursor)
            }
        };

        let end_match = self.find(end_anchor, search_from, self.config.end_search_window);
        let end_ts = match end_match {
            Some(at) => {
                let last = at + anchor_len - 1;
                self.cursor = at + anchor_len;
                self.timeline[last].end.max(start_ts)
            }
            None => {
                tracing::debug!(step = index, cursor = search_from, "end anchor not found");
                self.cursor = (search_from + step_tokens.len())
                    .min(self.timeline.len())
                    .max(self.cursor);
                start_ts + step_tokens.len() as f64 * self.config.seconds_per_word
            }
        };

        let confidence = if start_match.is_some() && end_match.is_some() {
            Confidence::High
        } else {
            Confidence::Low
        };

        self.previous = Some((start_ts, end_ts));
        StepSegment {
            index,
            text: text.to_string(),
            start_ts,
            end_ts,
            confidence,
        }
    }

    /// First position in `[from, from + window)` where `anchor` matches the
    /// timeline token-for-token.
    fn find(&self, anchor: &[String], from: usize, window: usize) -> Option<usize> {
        if anchor.is_empty() || self.tokens.len() < anchor.len() {
            return None;
        }
        let last_start = self.tokens.len() - anchor.len();
        let upper = from.saturating_add(window).min(last_start + 1);
        (from..upper).find(|&i| {
            self.tokens[i..i + anchor.len()]
                .iter()
                .zip(anchor)
                .all(|(t, a)| t == a)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(words: &[&str], step: f64) -> Vec<WordTimestamp> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| WordTimestamp {
                word: w.to_string(),
                start: i as f64 * step,
                end: i as f64 * step + step * 0.8,
            })
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn short_step_uses_whole_text_as_anchor() {
        let starts = [0.0, 0.5, 1.0, 1.5, 2.0];
        let ends = [0.4, 0.9, 1.4, 1.9, 2.4];
        let words: Vec<WordTimestamp> = ["Click", "the", "submit", "button", "now"]
            .iter()
            .zip(starts.iter().zip(ends))
            .map(|(w, (&start, end))| WordTimestamp {
                word: w.to_string(),
                start,
                end,
            })
            .collect();
        let segments = align(&["Click the submit"], &words, &AlignerConfig::default());

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[0].start_ts, 0.0);
        assert_eq!(segments[0].end_ts, 1.4);
        assert_eq!(segments[0].confidence, Confidence::High);
    }

    #[test]
    fn missing_anchors_without_predecessor_fall_back_to_word_rate() {
        let words = timeline(&["completely", "different", "speech"], 1.0);
        let segments = align(&["open the admin panel"], &words, &AlignerConfig::default());

        assert_eq!(segments[0].start_ts, 0.0);
        assert_close(segments[0].end_ts, 1.2);
        assert_eq!(segments[0].confidence, Confidence::Low);
    }

    #[test]
    fn matching_ignores_case_and_punctuation() {
        let words = timeline(&["Now,", "open", "the", "Settings!", "menu."], 1.0);
        let segments = align(
            &["now open the settings menu"],
            &words,
            &AlignerConfig::default(),
        );

        assert_eq!(segments[0].start_ts, 0.0);
        assert_close(segments[0].end_ts, 4.8);
        assert_eq!(segments[0].confidence, Confidence::High);
    }

    #[test]
    fn repeated_phrase_is_not_matched_twice() {
        let words = timeline(
            &["press", "save", "then", "wait", "press", "save", "again"],
            1.0,
        );
        let segments = align(
            &["press save then wait", "press save again"],
            &words,
            &AlignerConfig::default(),
        );

        assert_eq!(segments[0].start_ts, 0.0);
        assert_eq!(segments[1].start_ts, 4.0);
        assert_close(segments[1].end_ts, 6.8);
        assert!(segments.iter().all(|s| s.confidence == Confidence::High));
    }

    #[test]
    fn missing_start_anchor_continues_from_previous_end() {
        let words = timeline(&["first", "part", "done", "and", "then", "more", "words"], 1.0);
        let segments = align(
            &["first part done", "something paraphrased then more words"],
            &words,
            &AlignerConfig::default(),
        );

        assert_close(segments[0].end_ts, 2.8);
        assert_close(segments[1].start_ts, 2.8);
        assert_close(segments[1].end_ts, 6.8);
        assert_eq!(segments[1].confidence, Confidence::Low);
    }

    #[test]
    fn empty_step_is_zero_length_and_keeps_cursor() {
        let words = timeline(&["alpha", "beta", "gamma", "delta"], 1.0);
        let config = AlignerConfig::default();
        let mut aligner = TimelineAligner::new(&words, &config);

        let first = aligner.align_step("alpha beta");
        let cursor = aligner.cursor();
        let empty = aligner.align_step("  ... ");

        assert_eq!(aligner.cursor(), cursor);
        assert_eq!(empty.start_ts, first.end_ts);
        assert_eq!(empty.end_ts, empty.start_ts);
        assert_eq!(empty.index, 2);
    }

    #[test]
    fn start_anchor_outside_lookahead_window_is_not_found() {
        let mut words: Vec<&str> = vec!["filler"; 20];
        words.extend(["target", "phrase", "here"]);
        let words = timeline(&words, 1.0);
        let config = AlignerConfig {
            start_search_window: 10,
            ..AlignerConfig::default()
        };

        let segments = align(&["target phrase here"], &words, &config);
        assert_eq!(segments[0].start_ts, 0.0);
        assert_eq!(segments[0].confidence, Confidence::Low);
    }

    #[test]
    fn cursor_only_moves_forward_and_outputs_are_well_formed() {
        let text = "so first we log in then we open the dashboard and click reports \
                    after that we export the table to csv and finally we log out";
        let words: Vec<&str> = text.split_whitespace().collect();
        let words = timeline(&words, 0.4);
        let steps = [
            "So first we log in",
            "then we open the dashboard",
            "",
            "and click on reports",
            "totally unrelated sentence",
            "export the table to CSV",
            "finally we log out",
        ];
        let config = AlignerConfig::default();
        let mut aligner = TimelineAligner::new(&words, &config);

        let mut last_cursor = 0;
        let mut last_start = 0.0;
        for (i, step) in steps.iter().enumerate() {
            let seg = aligner.align_step(step);
            assert!(aligner.cursor() >= last_cursor);
            assert!(seg.end_ts >= seg.start_ts);
            assert!(seg.start_ts >= last_start);
            assert_eq!(seg.index, i + 1);
            assert_eq!(seg.text, *step);
            last_cursor = aligner.cursor();
            last_start = seg.start_ts;
        }
    }

    #[test]
    fn alignment_is_deterministic() {
        let words = timeline(&["one", "two", "three", "four", "five", "six"], 0.7);
        let steps = ["one two", "four five six", "seven"];
        let config = AlignerConfig::default();

        assert_eq!(
            align(&steps, &words, &config),
            align(&steps, &words, &config)
        );
    }

    #[test]
    fn empty_timeline_yields_heuristic_segments() {
        let segments = align(&["a b c", "d e"], &[], &AlignerConfig::default());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_ts, segments[0].end_ts);
        assert!(segments.iter().all(|s| s.confidence == Confidence::Low));
    }
}
