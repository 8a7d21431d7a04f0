//! ASI Runtime - the autonomous control loop
//!
//! One `Scheduler` owns every registry:
//! - Knowledge store: node id -> merged attribute record
//! - Task queue: swapped out whole and evaluated once per tick
//! - Hook registry: named listener lists fired on lifecycle events
//! - Part registry: externally owned subsystems polled every tick
//!
//! The host decides the cadence. Call `Scheduler::tick()` directly, or hand
//! the scheduler to `Scheduler::run()` to drive it from a tokio interval.

pub mod config;
mod deadline;
pub mod hooks;
pub mod knowledge;
pub mod parts;
pub mod queue;
pub mod scheduler;

pub use config::{AsiConfig, HeartbeatConfig, SchedulerConfig, TuningConfig};
pub use hooks::{HookRegistry, Listener, TASK_COMPLETE, TASK_FAILED};
pub use knowledge::KnowledgeStore;
pub use parts::{FnPart, Part, PartRegistry, PassivePart};
pub use queue::{PassReport, TaskQueue};
pub use scheduler::{InitConfig, Inspection, Scheduler, SchedulerStats, TickReport};
