//! vjobs - asynchronous job lifecycle for generative visual services
//!
//! vjobs tracks generation jobs (style suggestions, track analysis, images and
//! videos) from creation to a terminal status. Synchronous generators finish a
//! job in one pass; provider-async generators (video) hand work to an external
//! provider whose task is polled until it completes.
//!
//! # Architecture
//!
//! - **commands**: CLI command implementations (init, submit, process, poll, status, generate)
//! - **core**: Job manager, store, processor, dispatcher, task poller, client, generators and providers
//! - **models**: Data structures (config, job, payloads, status)
//! - **error**: Error types

pub mod commands;
pub mod core;
pub mod error;
pub mod models;

pub use error::{Result, VjobsError};
