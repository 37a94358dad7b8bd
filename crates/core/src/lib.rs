pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod health;
pub mod ids;
pub mod model;
pub mod stats;
pub mod time;
pub mod trend;

pub use error::{Result, SpanwatchError};
