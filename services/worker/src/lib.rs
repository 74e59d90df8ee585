//! quarry worker library.
//!
//! A worker polls the coordinator for jobs via heartbeats, stages
//! sources and upstream artifacts into sandboxed directories, runs
//! the job's commands, and publishes the resulting artifact from its
//! own HTTP endpoint for downstream jobs to fetch.

pub mod api;
pub mod config;
pub mod heartbeat;
pub mod job;

mod worker;

pub use worker::Worker;
