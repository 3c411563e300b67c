//! Curriculum checkpoints.
//!
//! A checkpoint is the whole curriculum document, replaced on every save. All
//! writes go through one [`CheckpointWriter`] task that owns the store, so
//! concurrently running generation work never touches persistence directly:
//! the orchestrator applies finished units to its own copy and submits a
//! snapshot through a [`CheckpointHandle`].

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::{
    fs,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::{Result, SyllabusError},
    types::Curriculum,
};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Replace the stored document for `curriculum.id`.
    async fn save(&self, curriculum: &Curriculum) -> Result<()>;

    async fn load(&self, curriculum_id: &str) -> Result<Option<Curriculum>>;
}

/// `<dir>/<id>.json`, written through a temp file so a failed write leaves the
/// previous checkpoint in place.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, curriculum_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", curriculum_id))
    }
}

#[async_trait]
impl CheckpointStore for JsonFileStore {
    async fn save(&self, curriculum: &Curriculum) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&curriculum.id);
        let tmp_path = path.with_extension("json.tmp");

        let pretty_json = serde_json::to_string_pretty(curriculum)?;
        fs::write(&tmp_path, &pretty_json).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn load(&self, curriculum_id: &str) -> Result<Option<Curriculum>> {
        let path = self.path_for(curriculum_id);
        let json_content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let curriculum: Curriculum = serde_json::from_str(&json_content)?;
        Ok(Some(curriculum))
    }
}

/// In-process store; keeps the latest document per id and counts saves.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Curriculum>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn get(&self, curriculum_id: &str) -> Option<Curriculum> {
        self.documents
            .lock()
            .expect("MemoryStore poisoned")
            .get(curriculum_id)
            .cloned()
    }

    pub fn insert(&self, curriculum: Curriculum) {
        self.documents
            .lock()
            .expect("MemoryStore poisoned")
            .insert(curriculum.id.clone(), curriculum);
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn save(&self, curriculum: &Curriculum) -> Result<()> {
        self.insert(curriculum.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn load(&self, curriculum_id: &str) -> Result<Option<Curriculum>> {
        Ok(self.get(curriculum_id))
    }
}

enum Command {
    Save {
        curriculum: Box<Curriculum>,
        ack: oneshot::Sender<Result<()>>,
    },
    Load {
        curriculum_id: String,
        reply: oneshot::Sender<Result<Option<Curriculum>>>,
    },
}

/// Single writer owning the checkpoint store.
pub struct CheckpointWriter {
    store: Arc<dyn CheckpointStore>,
    inbox: mpsc::Receiver<Command>,
}

impl CheckpointWriter {
    const INBOX_CAPACITY: usize = 32;

    /// Start the writer task. It stops once every handle has been dropped.
    pub fn spawn(store: Arc<dyn CheckpointStore>) -> (CheckpointHandle, JoinHandle<()>) {
        let (tx, inbox) = mpsc::channel(Self::INBOX_CAPACITY);
        let writer = CheckpointWriter { store, inbox };
        let task = tokio::spawn(writer.run());
        (CheckpointHandle { tx }, task)
    }

    async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            match command {
                Command::Save { curriculum, ack } => {
                    let result = self.store.save(&curriculum).await.map_err(|e| {
                        SyllabusError::Persistence {
                            curriculum_id: curriculum.id.clone(),
                            reason: e.to_string(),
                        }
                    });
                    match &result {
                        Ok(()) => tracing::debug!(
                            curriculum_id = %curriculum.id,
                            modules = curriculum.modules.len(),
                            lessons = curriculum.lesson_count(),
                            "checkpoint saved"
                        ),
                        Err(e) => tracing::error!(curriculum_id = %curriculum.id, "{e}"),
                    }
                    let _ = ack.send(result);
                }
                Command::Load {
                    curriculum_id,
                    reply,
                } => {
                    let _ = reply.send(self.store.load(&curriculum_id).await);
                }
            }
        }
        tracing::debug!("checkpoint writer stopped");
    }
}

#[derive(Clone)]
pub struct CheckpointHandle {
    tx: mpsc::Sender<Command>,
}

impl CheckpointHandle {
    /// Persist a snapshot and wait until the store has accepted or rejected it.
    pub async fn save(&self, curriculum: &Curriculum) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Save {
                curriculum: Box::new(curriculum.clone()),
                ack,
            })
            .await
            .map_err(|_| SyllabusError::WriterClosed)?;
        done.await.map_err(|_| SyllabusError::WriterClosed)?
    }

    pub async fn load(&self, curriculum_id: &str) -> Result<Option<Curriculum>> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Command::Load {
                curriculum_id: curriculum_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| SyllabusError::WriterClosed)?;
        done.await.map_err(|_| SyllabusError::WriterClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Module;

    fn curriculum(id: &str, modules: usize) -> Curriculum {
        Curriculum {
            id: id.to_string(),
            title: "Onboarding".into(),
            description: String::new(),
            modules: (0..modules)
                .map(|i| Module {
                    title: format!("Module {i}"),
                    ..Default::default()
                })
                .collect(),
        }
    }

    struct FailingStore;

    #[async_trait]
    impl CheckpointStore for FailingStore {
        async fn save(&self, _curriculum: &Curriculum) -> Result<()> {
            Err(std::io::Error::other("disk full").into())
        }

        async fn load(&self, _curriculum_id: &str) -> Result<Option<Curriculum>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn file_store_round_trips_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("checkpoints"));

        assert!(store.load("c1").await.unwrap().is_none());
        store.save(&curriculum("c1", 2)).await.unwrap();
        store.save(&curriculum("c1", 3)).await.unwrap();

        let loaded = store.load("c1").await.unwrap().unwrap();
        assert_eq!(loaded.modules.len(), 3);
        assert!(!store.path_for("c1").with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn writer_applies_saves_in_submission_order() {
        let store = Arc::new(MemoryStore::new());
        let (handle, task) = CheckpointWriter::spawn(store.clone());

        for modules in 1..=5 {
            handle.save(&curriculum("c1", modules)).await.unwrap();
        }
        let loaded = handle.load("c1").await.unwrap().unwrap();
        assert_eq!(loaded.modules.len(), 5);
        assert_eq!(store.save_count(), 5);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_persistence_error() {
        let (handle, _task) = CheckpointWriter::spawn(Arc::new(FailingStore));
        let err = handle.save(&curriculum("c9", 1)).await.unwrap_err();
        assert!(matches!(err, SyllabusError::Persistence { ref curriculum_id, .. } if curriculum_id == "c9"));
    }

    #[tokio::test]
    async fn clones_share_one_writer() {
        let store = Arc::new(MemoryStore::new());
        let (handle, _task) = CheckpointWriter::spawn(store.clone());
        let other = handle.clone();

        let (ca, cb) = (curriculum("a", 1), curriculum("b", 1));
        let (a, b) = tokio::join!(handle.save(&ca), other.save(&cb));
        a.unwrap();
        b.unwrap();
        assert_eq!(store.save_count(), 2);
        assert!(store.get("a").is_some() && store.get("b").is_some());
    }
}
