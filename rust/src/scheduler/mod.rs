//! Scheduling pipeline: dependency order, timeline packing, conflict resolution.
//!
//! [`Scheduler`] runs the whole pipeline against a [`TaskStore`](crate::store::TaskStore).
//! The packer and resolver can also be driven directly over any sequence of
//! `&mut Task`.

mod core;
mod packer;
mod resolver;
mod state;

pub use core::{OptimizeOptions, Scheduler, SchedulerError};
pub use packer::TimelinePacker;
pub use resolver::{resolve, ResolveMode};
pub use state::{day_start, next_work_day, PackCursor};
