//! Hook registry: named listener lists fired on lifecycle events
//!
//! Listeners run in registration order. A failing listener is logged with
//! the hook name and never stops its siblings or the caller. Panics count
//! as failures.

use crate::deadline::panic_message;
use asi_core::Error;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Fired with the task payload after a task evaluates cleanly.
pub const TASK_COMPLETE: &str = "taskComplete";
/// Fired with `{task, error}` after a task fails.
pub const TASK_FAILED: &str = "taskFailed";

pub type Listener = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<Listener>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: RwLock::new(HashMap::new()) }
    }

    /// Append a listener to `name`.
    pub fn on<F>(&self, name: &str, listener: F)
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut hooks = self.hooks.write().unwrap_or_else(|p| p.into_inner());
        hooks.entry(name.to_string()).or_default().push(Arc::new(listener));
    }

    /// Replace the whole listener list of `name`.
    pub fn replace(&self, name: &str, listeners: Vec<Listener>) {
        let mut hooks = self.hooks.write().unwrap_or_else(|p| p.into_inner());
        hooks.insert(name.to_string(), listeners);
    }

    pub fn listener_count(&self, name: &str) -> usize {
        let hooks = self.hooks.read().unwrap_or_else(|p| p.into_inner());
        hooks.get(name).map_or(0, Vec::len)
    }

    /// Invoke every listener of `name` with `payload`. An unknown name is a
    /// no-op. Returns the number of listeners that failed.
    pub fn trigger(&self, name: &str, payload: &Value) -> usize {
        // Clone out so listeners may register hooks without deadlocking.
        let listeners = {
            let hooks = self.hooks.read().unwrap_or_else(|p| p.into_inner());
            match hooks.get(name) {
                Some(list) => list.clone(),
                None => return 0,
            }
        };

        let mut failures = 0;
        for listener in listeners {
            let outcome = match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                Ok(result) => result,
                Err(panic) => Err(anyhow::anyhow!("listener panicked: {}", panic_message(panic.as_ref()))),
            };
            if let Err(e) = outcome {
                failures += 1;
                warn!(hook = name, "{}", Error::hook_failed(name, e));
            }
        }
        failures
    }
}
