use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::strategy::Strategy;

/// One record of the progress stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Status { msg: String },
    Result { payload: RunOutcome },
}

/// Sending side of the progress stream. Sends never block; a dropped receiver
/// just means nobody is listening.
#[derive(Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn status(&self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::info!("{msg}");
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent::Status { msg });
        }
    }

    pub fn result(&self, payload: RunOutcome) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent::Result { payload });
        }
    }
}

/// The unit of work a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkUnit {
    Summary { video: String },
    Plan,
    Direct,
    Persona,
    Chunk { module: usize, chunk: usize },
    Module { module: usize },
    MissingVideo { module: usize, video: String },
    Consolidation { module: usize },
    LessonEnrichment { module: usize, lesson: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit: WorkUnit,
    pub message: String,
}

/// Everything that degraded during a run. Completed work is in the curriculum;
/// this lists what was skipped or replaced by a fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    pub fn record(&mut self, unit: WorkUnit, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?unit, "{message}");
        self.failures.push(UnitFailure { unit, message });
    }

    pub fn extend(&mut self, other: RunReport) {
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&WorkUnit) -> bool) -> usize {
        self.failures.iter().filter(|f| pred(&f.unit)).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub curriculum_id: String,
    pub strategy: Option<Strategy>,
    pub modules: usize,
    pub lessons: usize,
    pub report: RunReport,
}
