pub mod client;
pub mod config;
pub mod dispatcher;
pub mod generators;
pub mod manager;
pub mod parser;
pub mod poller;
pub mod processor;
pub mod prompts;
pub mod providers;
pub mod store;

pub use client::*;
pub use config::*;
pub use dispatcher::*;
pub use generators::{Generator, GeneratorMode, GeneratorRegistry};
pub use manager::*;
pub use poller::*;
pub use processor::*;
pub use store::*;
