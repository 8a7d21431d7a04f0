//! Built-in heartbeat part
//!
//! Merges `{beats, at}` into its knowledge node on every poll. Writes go
//! through `update_graph`, so they stop while the loop is locked down.

use asi_core::Attributes;
use asi_runtime::{Part, Scheduler};
use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

pub struct Heartbeat {
    scheduler: Weak<Scheduler>,
    node: String,
    beats: AtomicU64,
}

impl Heartbeat {
    /// Holds the scheduler weakly; the scheduler owns the part.
    pub fn new(scheduler: Weak<Scheduler>, node: impl Into<String>) -> Self {
        Self { scheduler, node: node.into(), beats: AtomicU64::new(0) }
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Part for Heartbeat {
    async fn poll(&self) -> anyhow::Result<()> {
        let scheduler = self
            .scheduler
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("scheduler dropped"))?;
        let beats = self.beats.fetch_add(1, Ordering::Relaxed) + 1;

        let mut attrs = Attributes::new();
        attrs.insert("beats".into(), json!(beats));
        attrs.insert("at".into(), json!(Utc::now().to_rfc3339()));
        scheduler.update_graph(&self.node, attrs);
        Ok(())
    }
}
