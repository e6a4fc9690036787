//! Storage Quota Operator
//!
//! A Kubernetes operator that reconciles a StorageCluster's overprovision
//! policies into cluster-scoped ClusterResourceQuota objects, and exports
//! aggregate storage quota usage as Prometheus metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐    create/update/   ┌──────────────────────────┐
//! │  StorageQuota          │       delete        │  ClusterResourceQuota    │
//! │  Reconciler            │ ───────────────────▶│  objects (cluster scope) │
//! └────────────────────────┘                     └────────────┬─────────────┘
//!                                                  list+watch │
//! ┌────────────────────────┐      snapshot       ┌────────────▼─────────────┐
//! │  /metrics exposition   │◀─────────────────── │  StorageQuotaCollector   │
//! │  (hard/used gauges)    │                     │  (reflector cache)       │
//! └────────────────────────┘                     └──────────────────────────┘
//! ```
//!
//! The two halves never call each other; they interact only through the
//! shared object store.
//!
//! # Modules
//!
//! - [`controller`]: level-triggered StorageCluster reconciliation loop
//! - [`crd`]: resource types
//! - [`quota`]: capacity computation and quota convergence
//! - [`metrics`]: watch-backed usage aggregation and registration
//! - [`error`]: error types and requeue classification

pub mod controller;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod quota;

// Re-export commonly used types
pub use crd::{
    ClusterResourceQuota, ClusterResourceQuotaSelector, ClusterResourceQuotaSpec,
    ClusterResourceQuotaStatus, OverprovisionSpec, StorageCluster, StorageClusterSpec,
    StorageClusterStatus, StorageDeviceSet,
};

pub use controller::{run_controller, ControllerContext, STORAGE_QUOTA_FINALIZER};

pub use error::{Error, ErrorAction, Result};

pub use metrics::{register_custom_resource_collectors, StorageQuotaCollector};

pub use quota::{
    calc_useable_capacity, desired_storage_quotas, resource_request_name, storage_quota_name,
    KubeQuotaStore, QuotaStore, StorageQuotaReconciler,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
