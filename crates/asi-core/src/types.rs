//! Core types: tasks and knowledge attributes

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Attribute bag of a knowledge node. Merged key-by-key, never replaced.
pub type Attributes = serde_json::Map<String, Value>;

/// Zero-argument async operation attached to an `action` task.
pub type TaskExec = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// Dispatch key of a task. Unknown kinds are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskKind {
    Visual,
    Audio,
    Action,
    Other(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Visual => "visual",
            Self::Audio => "audio",
            Self::Action => "action",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for TaskKind {
    fn from(s: &str) -> Self {
        match s {
            "visual" => Self::Visual,
            "audio" => Self::Audio,
            "action" => Self::Action,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "visual" | "audio" | "action" => Self::from(s.as_str()),
            _ => Self::Other(s),
        }
    }
}

impl From<TaskKind> for String {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of pending work. Consumed exactly once by an evaluation pass.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Advisory only. Read and defaulted, never used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip)]
    pub exec: Option<TaskExec>,
}

impl Task {
    pub fn new(kind: impl Into<TaskKind>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            node_id: None,
            data: None,
            priority: None,
            exec: None,
        }
    }

    /// Vision observation: `faces` detected on `node`.
    pub fn visual(node: impl Into<String>, faces: impl Into<Value>) -> Self {
        Self::new(TaskKind::Visual)
            .with_node(node)
            .with_data(serde_json::json!({ "faces": faces.into() }))
    }

    /// Audio observation: input `level` on `node`.
    pub fn audio(node: impl Into<String>, level: impl Into<Value>) -> Self {
        Self::new(TaskKind::Audio)
            .with_node(node)
            .with_data(serde_json::json!({ "level": level.into() }))
    }

    pub fn action<F, Fut>(exec: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(TaskKind::Action).with_exec(exec)
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node_id = Some(node.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_exec<F, Fut>(mut self, exec: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.exec = Some(Arc::new(move || -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(exec())
        }));
        self
    }

    /// Parse `{type, nodeId?, data?, priority?}`. `null`, non-objects and
    /// objects without a `type` yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// The typed stand-in for an absent task.
    pub fn is_empty(&self) -> bool {
        matches!(&self.kind, TaskKind::Other(s) if s.is_empty())
    }

    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or(0)
    }

    /// Look up a field of `data`, treating `null` as absent.
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .filter(|v| !v.is_null())
    }

    /// JSON payload handed to hook listeners.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("node_id", &self.node_id)
            .field("data", &self.data)
            .field("priority", &self.priority)
            .field("exec", &self.exec.is_some())
            .finish()
    }
}
