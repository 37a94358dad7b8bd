pub mod db;
pub mod engine;
pub mod load;
pub mod schema;
pub mod statements;
pub mod write;

pub use db::Store;
pub use load::DatasetSummary;
pub use spanwatch_core::model::dataset::Dataset;
