//! Parallel directory traversal
//!
//! A small pool of workers shares a self-feeding directory queue: each
//! worker pulls a directory, pushes its non-excluded subdirectories back
//! onto the same queue, and streams type-accepted files to the scan queue.
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │   directory queue (Q0)       │◄──┐
//!            └──────────────┬───────────────┘   │ subdirs
//!                           │                   │
//!                ┌──────────┴──────────┐        │
//!                │  Walker 1 .. N      │────────┘
//!                └──────────┬──────────┘
//!                           │ accepted files
//!                           ▼
//!            ┌──────────────────────────────┐
//!            │   scan queue (Q1)            │
//!            └──────────────────────────────┘
//! ```
//!
//! Termination uses the queue's idle quorum: when every walker is parked
//! on an empty Q0 there can be no more work, and the coordinator closes
//! the queue.

pub mod visited;
pub mod worker;

pub use visited::VisitedSet;
pub use worker::{TraversalContext, TraversalStats, TraversalWorker};
