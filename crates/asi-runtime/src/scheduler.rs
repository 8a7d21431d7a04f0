//! Scheduler: the main loop
//!
//! Owns the knowledge store, task queue, hook registry and part registry.
//! Each tick polls every part, evaluates one closed snapshot of the queue,
//! self-tunes the interval hint, then stamps the tick time.
//!
//! The lockdown gate suppresses new task admission, self-tuning and
//! external graph writes. Tasks already queued still evaluate and parts
//! are still polled. In-flight operations are not aborted.

use crate::config::AsiConfig;
use crate::deadline::bounded;
use crate::hooks::{HookRegistry, Listener, TASK_COMPLETE, TASK_FAILED};
use crate::knowledge::KnowledgeStore;
use crate::parts::{Part, PartRegistry};
use crate::queue::{self, PassReport, TaskQueue};
use asi_core::{Attributes, Error, Task};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Init / inspection types
// ---------------------------------------------------------------------------

/// Everything `init` installs in one go.
#[derive(Default)]
pub struct InitConfig {
    /// Listener lists keyed by hook name. Each replaces the current list.
    pub event_hooks: HashMap<String, Vec<Listener>>,
    /// Parts to register, in order.
    pub parts: Vec<(String, Arc<dyn Part>)>,
}

impl InitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, name: impl Into<String>, part: impl Part + 'static) -> Self {
        self.parts.push((name.into(), Arc::new(part)));
        self
    }

    pub fn hook<F>(mut self, name: impl Into<String>, listener: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.event_hooks.entry(name.into()).or_default().push(Arc::new(listener));
        self
    }
}

/// Loop telemetry, readable through `inspect()`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub initialized: bool,
    pub lockdown: bool,
    pub loop_interval_hint_ms: u64,
    pub ticks: u64,
    pub nodes: usize,
    pub parts: Vec<String>,
    pub tasks_completed: u64,
    pub task_failures: u64,
    pub part_failures: u64,
    pub hook_failures: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// Read view of the store, the pending queue and loop telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub graph: BTreeMap<String, Attributes>,
    pub tasks: Vec<Task>,
    pub stats: SchedulerStats,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// False when the tick idled because `init` has not run.
    pub ran: bool,
    pub parts_polled: usize,
    pub part_failures: usize,
    pub pass: PassReport,
    pub tuned: bool,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct LoopState {
    initialized: bool,
    /// Set while `init` installs parts and hooks.
    initializing: bool,
    last_tick: Option<Instant>,
    last_tick_at: Option<DateTime<Utc>>,
    loop_interval_hint_ms: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    tasks_completed: AtomicU64,
    task_failures: AtomicU64,
    part_failures: AtomicU64,
    hook_failures: AtomicU64,
}

pub struct Scheduler {
    config: AsiConfig,
    store: KnowledgeStore,
    queue: TaskQueue,
    hooks: HookRegistry,
    parts: PartRegistry,
    state: Mutex<LoopState>,
    lockdown: AtomicBool,
    counters: Counters,
    /// Single writer for a whole tick. Ticks never overlap.
    tick_lock: tokio::sync::Mutex<()>,
}

impl Default for Scheduler {
    fn default() -> Self { Self::new(AsiConfig::default()) }
}

impl Scheduler {
    pub fn new(config: AsiConfig) -> Self {
        let hooks = HookRegistry::new();
        hooks.on(TASK_COMPLETE, |payload| {
            debug!(task = %payload["id"], kind = %payload["type"], "task complete");
            Ok(())
        });

        let hint = config.tuning.initial_interval_ms;
        Self {
            config,
            store: KnowledgeStore::new(),
            queue: TaskQueue::new(),
            hooks,
            parts: PartRegistry::new(),
            state: Mutex::new(LoopState {
                initialized: false,
                initializing: false,
                last_tick: None,
                last_tick_at: None,
                loop_interval_hint_ms: hint,
            }),
            lockdown: AtomicBool::new(false),
            counters: Counters::default(),
            tick_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn config(&self) -> &AsiConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn is_locked_down(&self) -> bool {
        self.lockdown.load(Ordering::SeqCst)
    }

    pub fn loop_interval_hint_ms(&self) -> u64 {
        self.state().loop_interval_hint_ms
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn part_names(&self) -> Vec<String> {
        self.parts.names()
    }

    // --- Registration ---

    /// Register a part, replacing any part already registered under `name`.
    pub fn register_part(&self, name: &str, part: Arc<dyn Part>) {
        let replaced = self.parts.register(name, part);
        info!(part = name, replaced, "Registered part");
    }

    /// Append a hook listener.
    pub fn on<F>(&self, name: &str, listener: F)
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on(name, listener);
    }

    /// Install parts and hooks, then mark the loop initialized. Returns false
    /// without doing anything if already initialized.
    pub fn init(&self, config: InitConfig) -> bool {
        {
            let mut state = self.state();
            if state.initialized || state.initializing {
                debug!("init called twice — ignoring");
                return false;
            }
            state.initializing = true;
        }

        for (name, part) in config.parts {
            self.register_part(&name, part);
        }
        for (name, listeners) in config.event_hooks {
            debug!(hook = %name, listeners = listeners.len(), "Installing hook");
            self.hooks.replace(&name, listeners);
        }

        // Ticks stay idle until everything above is in place.
        {
            let mut state = self.state();
            state.initializing = false;
            state.initialized = true;
            state.last_tick = Some(Instant::now());
        }
        if self.parts.is_empty() {
            info!("Scheduler initialized with no parts");
        } else {
            info!(parts = ?self.parts.names(), "Scheduler initialized");
        }
        true
    }

    // --- Safety gate ---

    pub fn lockdown(&self, enable: bool) {
        let was = self.lockdown.swap(enable, Ordering::SeqCst);
        warn!(enabled = enable, previously = was, "Lockdown {}", if enable { "engaged" } else { "released" });
    }

    // --- Mutating entry points ---

    /// Queue a task for the next pass. Empty tasks and anything offered under
    /// lockdown are dropped. Returns whether the task was admitted.
    pub fn add_task(&self, task: Task) -> bool {
        if task.is_empty() {
            trace!("Rejected empty task");
            return false;
        }
        if self.is_locked_down() {
            debug!(task = %task.id, kind = %task.kind, "Rejected task under lockdown");
            return false;
        }
        trace!(task = %task.id, kind = %task.kind, priority = task.effective_priority(), "Task queued");
        self.queue.push(task);
        true
    }

    /// Parse and queue a task in its JSON wire shape.
    pub fn add_task_value(&self, value: &Value) -> bool {
        match Task::from_value(value) {
            Some(task) => self.add_task(task),
            None => {
                trace!("Rejected malformed task");
                false
            }
        }
    }

    /// Merge attributes into a node from outside the loop. Dropped under
    /// lockdown. Returns whether the write was applied.
    pub fn update_graph(&self, node_id: &str, attrs: Attributes) -> bool {
        if self.is_locked_down() {
            debug!(node = node_id, "Rejected graph write under lockdown");
            return false;
        }
        self.store.merge(node_id, attrs);
        true
    }

    /// Fire `name` with `payload`. Returns the number of failed listeners.
    pub fn trigger_hook(&self, name: &str, payload: &Value) -> usize {
        let failures = self.hooks.trigger(name, payload);
        if failures > 0 {
            self.counters.hook_failures.fetch_add(failures as u64, Ordering::Relaxed);
        }
        failures
    }

    // --- Loop body ---

    /// Poll every pollable part in registration order.
    pub async fn poll_parts(&self) -> (usize, usize) {
        let limit = self.config.scheduler.poll_timeout();
        let mut polled = 0;
        let mut failed = 0;
        for (name, part) in self.parts.handles() {
            if !part.is_pollable() {
                continue;
            }
            polled += 1;
            let what = format!("poll of {}", name);
            if let Err(e) = bounded(&what, limit, async { part.poll().await }).await {
                failed += 1;
                self.counters.part_failures.fetch_add(1, Ordering::Relaxed);
                warn!(part = %name, "{}", Error::part_failed(name.as_str(), e));
            }
        }
        (polled, failed)
    }

    /// One evaluation pass over a closed snapshot of the queue.
    pub async fn evaluate_tasks(&self) -> PassReport {
        let tasks = self.queue.take_all();
        let mut report = PassReport::default();
        if tasks.is_empty() {
            return report;
        }

        let limit = self.config.scheduler.task_timeout();
        for task in tasks {
            report.evaluated += 1;
            match queue::evaluate(&task, &self.store, limit).await {
                Ok(()) => {
                    report.completed += 1;
                    self.counters.tasks_completed.fetch_add(1, Ordering::Relaxed);
                    self.trigger_hook(TASK_COMPLETE, &task.to_payload());
                }
                Err(e) => {
                    report.failed += 1;
                    self.counters.task_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        task = %task.id,
                        kind = %task.kind,
                        node = task.node_id.as_deref().unwrap_or("-"),
                        "Task failed: {}", e
                    );
                    let payload = json!({ "task": task.to_payload(), "error": e.to_string() });
                    self.trigger_hook(TASK_FAILED, &payload);
                }
            }
        }
        debug!(evaluated = report.evaluated, failed = report.failed, "Evaluation pass done");
        report
    }

    /// Lower the interval hint by one step when the last tick gap was slow.
    /// No-op under lockdown. Returns whether the hint changed.
    pub fn self_optimize(&self, elapsed: Duration) -> bool {
        if self.is_locked_down() {
            return false;
        }
        let tuning = &self.config.tuning;
        if elapsed <= Duration::from_millis(tuning.slow_tick_threshold_ms) {
            return false;
        }

        let mut state = self.state();
        let current = state.loop_interval_hint_ms;
        let lowered = current.saturating_sub(tuning.step_ms).max(tuning.floor_ms);
        if lowered >= current {
            return false;
        }
        state.loop_interval_hint_ms = lowered;
        debug!(elapsed_ms = elapsed.as_millis() as u64, from = current, to = lowered, "Interval hint lowered");
        true
    }

    /// Run one iteration. Idles until `init` has been called.
    pub async fn tick(&self) -> TickReport {
        let _guard = self.tick_lock.lock().await;
        if !self.is_initialized() {
            return TickReport::default();
        }

        let (parts_polled, part_failures) = self.poll_parts().await;
        let pass = self.evaluate_tasks().await;

        let now = Instant::now();
        let elapsed = self.state().last_tick.map(|t| now.duration_since(t));
        let tuned = elapsed.is_some_and(|e| self.self_optimize(e));
        {
            let mut state = self.state();
            state.last_tick = Some(now);
            state.last_tick_at = Some(Utc::now());
        }
        let ticks = self.counters.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(tick = ticks, parts_polled, part_failures, tasks = pass.evaluated, "Tick");

        TickReport { ran: true, parts_polled, part_failures, pass, tuned }
    }

    /// Drive `tick()` at the configured cadence until `cancel` fires or
    /// `max_ticks` ticks have run. Returns the number of ticks driven.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken, max_ticks: Option<u64>) -> u64 {
        let period = self.config.scheduler.tick_period();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "Scheduler loop started");

        let mut driven = 0;
        loop {
            if max_ticks.is_some_and(|max| driven >= max) {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                    driven += 1;
                }
            }
        }
        info!(ticks = driven, "Scheduler loop stopped");
        driven
    }

    // --- Reporting ---

    pub fn stats(&self) -> SchedulerStats {
        let state = self.state();
        SchedulerStats {
            initialized: state.initialized,
            lockdown: self.is_locked_down(),
            loop_interval_hint_ms: state.loop_interval_hint_ms,
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            nodes: self.store.len(),
            parts: self.parts.names(),
            tasks_completed: self.counters.tasks_completed.load(Ordering::Relaxed),
            task_failures: self.counters.task_failures.load(Ordering::Relaxed),
            part_failures: self.counters.part_failures.load(Ordering::Relaxed),
            hook_failures: self.counters.hook_failures.load(Ordering::Relaxed),
            last_tick_at: state.last_tick_at,
        }
    }

    pub fn inspect(&self) -> Inspection {
        Inspection {
            graph: self.store.snapshot(),
            tasks: self.queue.snapshot(),
            stats: self.stats(),
        }
    }
}
