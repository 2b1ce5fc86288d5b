pub mod config;
pub mod job;
pub mod payload;
pub mod status;

pub use config::*;
pub use job::*;
pub use payload::*;
pub use status::*;
