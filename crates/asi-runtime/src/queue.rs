//! Task queue and single-task evaluation
//!
//! The queue is append-only between passes. A pass swaps the live buffer for
//! an empty one, so anything added while it runs lands in the next pass.

use crate::deadline::bounded;
use crate::knowledge::KnowledgeStore;
use asi_core::{Attributes, Error, Result, Task, TaskKind};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<Vec<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self { tasks: Mutex::new(Vec::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, task: Task) {
        self.lock().push(task);
    }

    /// Take every queued task in insertion order, leaving the queue empty.
    pub fn take_all(&self) -> Vec<Task> {
        std::mem::take(&mut *self.lock())
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Outcome counts of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub evaluated: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Evaluate one task against the store.
///
/// `visual` merges `{faces}` and `audio` merges `{audioLevel}` into the
/// task's node, each defaulting to 0 when the payload omits it. `action`
/// awaits the attached exec, if any. Other kinds succeed without effect.
pub async fn evaluate(task: &Task, store: &KnowledgeStore, exec_timeout: Option<Duration>) -> Result<()> {
    match &task.kind {
        TaskKind::Visual => {
            let node = require_node(task)?;
            store.merge(node, single("faces", field_or_zero(task, "faces")));
        }
        TaskKind::Audio => {
            let node = require_node(task)?;
            store.merge(node, single("audioLevel", field_or_zero(task, "level")));
        }
        TaskKind::Action => {
            if let Some(exec) = &task.exec {
                let what = format!("exec of task {}", task.id);
                bounded(&what, exec_timeout, async { exec().await })
                    .await
                    .map_err(|e| Error::task_failed(task.id.to_string(), e))?;
            }
        }
        TaskKind::Other(_) => {}
    }
    Ok(())
}

fn require_node(task: &Task) -> Result<&str> {
    task.node_id
        .as_deref()
        .ok_or_else(|| Error::MissingNode { kind: task.kind.to_string() })
}

fn field_or_zero(task: &Task, key: &str) -> Value {
    task.data_field(key).cloned().unwrap_or_else(|| Value::from(0))
}

fn single(key: &str, value: Value) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert(key.to_string(), value);
    attrs
}
