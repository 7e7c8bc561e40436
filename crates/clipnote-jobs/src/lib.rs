//! Task scheduling and the clip pipeline.
//!
//! The [`Scheduler`] owns a priority queue of clip tasks and dispatches them
//! up to a concurrency ceiling. Each dispatched task runs the registered
//! [`TaskHandler`]; the production handler is [`ClipPipeline`], which fetches
//! the page, renders the matching template, stores the article, and
//! optionally runs text analysis.
//!
//! Task and batch state live behind the repository traits from
//! `clipnote-core`; [`InMemoryTaskStore`] is the bundled implementation.

pub mod batch;
pub mod handler;
pub mod pipeline;
pub mod scheduler;
pub mod tracker;

pub use batch::BatchAggregator;
pub use handler::{NoOpTaskHandler, TaskContext, TaskHandler, TaskResult};
pub use pipeline::ClipPipeline;
pub use scheduler::{
    BatchOptions, Scheduler, SchedulerConfig, SchedulerEvent, SchedulerHandle, SubmitOptions,
};
pub use tracker::InMemoryTaskStore;
