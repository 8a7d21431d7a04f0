//! Error types for the ASI control loop

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("part failed: {name} - {message}")]
    PartFailed { name: String, message: String },

    #[error("task failed: {task} - {message}")]
    TaskFailed { task: String, message: String },

    #[error("{kind} task has no node id")]
    MissingNode { kind: String },

    #[error("{what} timed out after {after_ms}ms")]
    Timeout { what: String, after_ms: u64 },

    #[error("hook failed: {hook} - {message}")]
    HookFailed { hook: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn part_failed(name: impl Into<String>, message: impl ToString) -> Self {
        Self::PartFailed {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn task_failed(task: impl Into<String>, message: impl ToString) -> Self {
        Self::TaskFailed {
            task: task.into(),
            message: message.to_string(),
        }
    }

    pub fn hook_failed(hook: impl Into<String>, message: impl ToString) -> Self {
        Self::HookFailed {
            hook: hook.into(),
            message: message.to_string(),
        }
    }

    pub fn timeout(what: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            after_ms,
        }
    }
}
