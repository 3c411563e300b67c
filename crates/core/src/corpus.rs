use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use tokio::fs;

use crate::{
    error::{Result, SyllabusError},
    types::VideoContext,
};

/// Read side of the processed video corpus.
#[async_trait]
pub trait CorpusReader: Send + Sync {
    async fn list_videos(&self) -> Result<Vec<VideoContext>>;

    /// Remember a generated summary on the video's metadata.
    async fn save_summary(&self, filename: &str, summary: &str) -> Result<()>;
}

/// A directory holding one `VideoContext` JSON document per video.
///
/// `list_videos` remembers which document holds which video, so caching a
/// summary rewrites one file instead of rescanning the directory.
pub struct JsonDirCorpus {
    dir: PathBuf,
    index: Mutex<HashMap<String, PathBuf>>,
}

impl JsonDirCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: Mutex::new(HashMap::new()),
        }
    }

    fn indexed_path(&self, filename: &str) -> Option<PathBuf> {
        self.index
            .lock()
            .expect("corpus index poisoned")
            .get(filename)
            .cloned()
    }

    async fn find_document(&self, filename: &str) -> Result<Option<(PathBuf, VideoContext)>> {
        if let Some(path) = self.indexed_path(filename) {
            let video = Self::read_document(&path).await?;
            if video.filename == filename {
                return Ok(Some((path, video)));
            }
        }
        for path in self.document_paths().await? {
            let video = Self::read_document(&path).await?;
            if video.filename == filename {
                return Ok(Some((path, video)));
            }
        }
        Ok(None)
    }

    async fn document_paths(&self) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| SyllabusError::Corpus {
                path: self.dir.clone(),
                reason: e.to_string(),
            })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn read_document(path: &Path) -> Result<VideoContext> {
        let raw = fs::read_to_string(path).await?;
        serde_json::from_str(&raw).map_err(|e| SyllabusError::Corpus {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl CorpusReader for JsonDirCorpus {
    async fn list_videos(&self) -> Result<Vec<VideoContext>> {
        let mut videos = Vec::new();
        let mut index = HashMap::new();
        for path in self.document_paths().await? {
            let video = Self::read_document(&path).await?;
            index.insert(video.filename.clone(), path);
            videos.push(video);
        }
        *self.index.lock().expect("corpus index poisoned") = index;
        tracing::debug!(dir = %self.dir.display(), count = videos.len(), "corpus loaded");
        Ok(videos)
    }

    async fn save_summary(&self, filename: &str, summary: &str) -> Result<()> {
        let Some((path, mut video)) = self.find_document(filename).await? else {
            return Err(SyllabusError::Corpus {
                path: self.dir.clone(),
                reason: format!("no document for video {filename}"),
            });
        };
        video.summary = Some(summary.to_string());

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&video)?).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn write_video(dir: &Path, file: &str, filename: &str) {
        let doc = json!({
            "filename": filename,
            "duration": 12.0,
            "transcript": { "segments": [{"start": 0.0, "end": 2.0, "text": "hello"}] },
            "on_screen": { "events": [{"timestamp": 1.0, "text": "Dashboard"}] }
        });
        fs::write(dir.join(file), doc.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn lists_json_documents_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "b.json", "second.mp4").await;
        write_video(dir.path(), "a.json", "first.mp4").await;
        fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let corpus = JsonDirCorpus::new(dir.path());
        let videos = corpus.list_videos().await.unwrap();

        let names: Vec<_> = videos.iter().map(|v| v.filename.as_str()).collect();
        assert_eq!(names, ["first.mp4", "second.mp4"]);
        assert!(videos[0].summary.is_none());
    }

    #[tokio::test]
    async fn summary_is_persisted_on_the_document() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "a.json", "first.mp4").await;
        let corpus = JsonDirCorpus::new(dir.path());

        corpus.save_summary("first.mp4", "Covers login.").await.unwrap();

        let videos = corpus.list_videos().await.unwrap();
        assert_eq!(videos[0].cached_summary(), Some("Covers login."));
        assert!(corpus.save_summary("missing.mp4", "x").await.is_err());
    }

    #[tokio::test]
    async fn missing_directory_is_a_corpus_error() {
        let corpus = JsonDirCorpus::new("/definitely/not/here");
        let err = corpus.list_videos().await.unwrap_err();
        assert!(matches!(err, SyllabusError::Corpus { .. }));
    }

    #[tokio::test]
    async fn listed_videos_are_indexed_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "a.json", "first.mp4").await;
        write_video(dir.path(), "b.json", "second.mp4").await;
        let corpus = JsonDirCorpus::new(dir.path());
        corpus.list_videos().await.unwrap();

        assert_eq!(corpus.indexed_path("second.mp4"), Some(dir.path().join("b.json")));

        // a broken sibling is never parsed once the target is indexed
        fs::write(dir.path().join("a.json"), "{ not json").await.unwrap();
        corpus.save_summary("second.mp4", "Covers storage.").await.unwrap();

        let raw = fs::read_to_string(dir.path().join("b.json")).await.unwrap();
        let saved: VideoContext = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.cached_summary(), Some("Covers storage."));
    }
}
