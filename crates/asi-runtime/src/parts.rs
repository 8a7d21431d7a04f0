//! Part registry and trait definitions
//!
//! A part is an externally owned subsystem the scheduler polls once per
//! tick. The scheduler holds only a handle; the part keeps its own state.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// The Part trait. Implement it to plug a subsystem into the loop.
#[async_trait::async_trait]
pub trait Part: Send + Sync {
    /// Whether this part exposes a poll operation at all.
    fn is_pollable(&self) -> bool { true }

    /// Called once per tick. A failure is logged and isolated to this part.
    async fn poll(&self) -> anyhow::Result<()> { Ok(()) }
}

type PollFn = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Adapts an async closure into a part.
pub struct FnPart {
    poll: PollFn,
}

impl FnPart {
    pub fn new<F, Fut>(poll: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self { poll: Box::new(move || -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(poll()) }) }
    }
}

#[async_trait::async_trait]
impl Part for FnPart {
    async fn poll(&self) -> anyhow::Result<()> {
        (self.poll)().await
    }
}

/// A registered handle with no poll operation.
pub struct PassivePart;

#[async_trait::async_trait]
impl Part for PassivePart {
    fn is_pollable(&self) -> bool { false }
}

/// Parts in registration order. Re-registering a name replaces the handle
/// in place.
#[derive(Default)]
pub struct PartRegistry {
    parts: RwLock<Vec<(String, Arc<dyn Part>)>>,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self { parts: RwLock::new(Vec::new()) }
    }

    /// Register a part. Returns true if it replaced an existing one.
    pub fn register(&self, name: &str, part: Arc<dyn Part>) -> bool {
        let mut parts = self.parts.write().unwrap_or_else(|p| p.into_inner());
        match parts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = part;
                true
            }
            None => {
                parts.push((name.to_string(), part));
                false
            }
        }
    }

    /// Snapshot of all handles, for polling outside the lock.
    pub fn handles(&self) -> Vec<(String, Arc<dyn Part>)> {
        self.parts.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn names(&self) -> Vec<String> {
        let parts = self.parts.read().unwrap_or_else(|p| p.into_inner());
        parts.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.parts.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
