//! Reply scheduling for courier
//!
//! [`Courier`] is the producer-facing context (enqueue, resolve, abandon);
//! [`Scheduler`] drains the queues through the dispatcher on a fixed tick.

pub mod context;
pub mod scheduler;

pub use context::Courier;
pub use scheduler::{Scheduler, SchedulerOptions, SchedulerStats};
