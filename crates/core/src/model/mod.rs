pub mod dataset;
pub mod dependency;
pub mod span;
pub mod trace;
