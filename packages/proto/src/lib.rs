//! Shared wire and domain types for the transcoding fleet coordinator.
//!
//! This crate has no IO of its own: it is the vocabulary every other crate
//! (store, scheduler, master, worker, wrapper, watchdog, cli) imports so that
//! a `Job` or `Node` means the same thing everywhere.

pub mod capability;
pub mod engine;
pub mod failure;
pub mod job;
pub mod node;
pub mod validate;
pub mod wire;

pub use capability::{capability_satisfied, known_capability_tokens};
pub use engine::Engine;
pub use failure::FailureReason;
pub use job::{Job, JobStatus, Priority, Queue, Transition};
pub use node::{Node, NodeStatus, NodeType};
