//! Storage quota reconciliation core
//!
//! - [`capacity`]: quantity parsing and binary-SI rendering
//! - [`reconciler`]: desired-state computation and convergence
//! - [`store`]: the object-store seam the reconciler writes through

pub mod capacity;
pub mod reconciler;
pub mod store;

pub use capacity::{approx_f64, binary_quantity, parse_quantity};
pub use reconciler::{
    calc_useable_capacity, desired_storage_quotas, resource_request_name, storage_quota_name,
    StorageQuotaReconciler, CLUSTER_RESOURCE_QUOTA_STORAGE_KEY, RESOURCE_REQUESTS_STORAGE,
    RESOURCE_STORAGE, STORAGE_CLASS_SUFFIX,
};
pub use store::{KubeQuotaStore, QuotaStore};
