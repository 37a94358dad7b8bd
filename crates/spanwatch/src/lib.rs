pub mod http;
pub mod service;

pub use service::{Observability, ServiceDetail, ServiceSettings, StoreStatus};
