//! Quota usage aggregation and metrics registration
//!
//! - [`storage_quota`]: watch-backed collector summing quota storage totals
//! - [`registry`]: explicit registration into a Prometheus registry

pub mod registry;
pub mod storage_quota;

pub use registry::register_custom_resource_collectors;
pub use storage_quota::{sum_storage_quotas, StorageQuotaCollector};
