//! ClusterResourceQuota reconciliation
//!
//! Converges the set of cluster-scoped ClusterResourceQuota objects to the
//! desired state computed from a StorageCluster's overprovision policies.
//! One quota object exists per policy, positionally named; intent computation
//! is a pure function of the spec so it stays independently testable.

use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use k8s_openapi::api::core::v1::ResourceQuotaSpec;

use crate::crd::{ClusterResourceQuota, ClusterResourceQuotaSpec, StorageCluster};
use crate::error::Result;
use crate::quota::capacity::{approx_f64, binary_quantity};
use crate::quota::store::QuotaStore;

// =============================================================================
// Naming
// =============================================================================

/// Positional infix of every quota object name owned by a cluster.
pub const CLUSTER_RESOURCE_QUOTA_STORAGE_KEY: &str = "clusterresourcequota-storage";

/// Suffix of the qualified portion of a storage-class resource name. Fixed
/// protocol constant; quota is keyed as
/// `<storage-class>.storageclass.storage.k8s.io/<resource>`.
pub const STORAGE_CLASS_SUFFIX: &str = ".storageclass.storage.k8s.io/";

/// The storage-request resource token.
pub const RESOURCE_REQUESTS_STORAGE: &str = "requests.storage";

/// Marker substring identifying storage resources in quota resource lists.
pub const RESOURCE_STORAGE: &str = "storage";

/// Deterministic, 1-based positional name of the quota object for the policy
/// at `idx`.
pub fn storage_quota_name(cluster_name: &str, idx: usize) -> String {
    format!(
        "{}-{}{}",
        cluster_name,
        CLUSTER_RESOURCE_QUOTA_STORAGE_KEY,
        idx + 1
    )
}

/// Quota resource name for a storage class; the bare `requests.storage`
/// token when no class is named.
pub fn resource_request_name(storage_class_name: Option<&str>) -> String {
    match storage_class_name {
        Some(class) if !class.is_empty() => {
            format!("{}{}{}", class, STORAGE_CLASS_SUFFIX, RESOURCE_REQUESTS_STORAGE)
        }
        _ => RESOURCE_REQUESTS_STORAGE.to_string(),
    }
}

// =============================================================================
// Capacity
// =============================================================================

/// Sum of requested-storage x replica across all device sets, truncated to
/// integer bytes per set. Sets without a storage request contribute zero.
pub fn calc_useable_capacity(sc: &StorageCluster) -> i64 {
    let mut useable_capacity = 0i64;
    for ds in &sc.spec.storage_device_sets {
        if let Some(request) = ds.storage_request() {
            useable_capacity += approx_f64(request) as i64 * i64::from(ds.replica);
        }
    }
    useable_capacity
}

// =============================================================================
// Desired state
// =============================================================================

/// The full desired quota-object list for a cluster, one object per
/// overprovision policy. Pure; performs no I/O.
pub fn desired_storage_quotas(sc: &StorageCluster) -> Vec<ClusterResourceQuota> {
    let cluster_name = sc.name_any();
    let useable_capacity = calc_useable_capacity(sc);

    sc.spec
        .overprovision
        .iter()
        .enumerate()
        .map(|(idx, policy)| {
            // Explicit capacity wins; otherwise scale useable capacity by the
            // percentage with integer-division truncation.
            let hard_limit = match &policy.capacity {
                Some(capacity) => capacity.clone(),
                None => {
                    let percentage = i64::from(policy.percentage.unwrap_or(0));
                    binary_quantity(useable_capacity + percentage * useable_capacity / 100)
                }
            };
            let request_name = resource_request_name(policy.storage_class_name.as_deref());

            ClusterResourceQuota::new(
                &storage_quota_name(&cluster_name, idx),
                ClusterResourceQuotaSpec {
                    selector: policy.selector.clone(),
                    quota: ResourceQuotaSpec {
                        hard: Some(BTreeMap::from([(request_name, hard_limit)])),
                        ..Default::default()
                    },
                },
            )
        })
        .collect()
}

// =============================================================================
// Reconciler
// =============================================================================

/// Converges quota objects against a [`QuotaStore`].
///
/// Single-threaded by design: one `ensure_created`/`ensure_deleted` call per
/// reconciliation pass, no internal locking. Overlapping passes for the same
/// cluster race as last-writer-wins on the store.
pub struct StorageQuotaReconciler<S> {
    store: S,
}

impl<S: QuotaStore> StorageQuotaReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ensures one ClusterResourceQuota exists per overprovision policy with
    /// the desired spec.
    ///
    /// Processing follows policy order with no cross-policy transaction: the
    /// first fetch/create/update error aborts the pass, objects converged
    /// earlier stay converged, and the next pass self-heals the remainder.
    pub async fn ensure_created(&self, sc: &StorageCluster) -> Result<()> {
        for desired in desired_storage_quotas(sc) {
            let name = desired.name_any();
            let current = match self.store.get(&name).await {
                Ok(current) => current,
                Err(err) => {
                    error!(name = %name, error = %err, "Get ClusterResourceQuota failed");
                    return Err(err);
                }
            };
            match current {
                None => {
                    info!(
                        name = %name,
                        hard = ?desired.spec.quota.hard,
                        "Creating ClusterResourceQuota"
                    );
                    if let Err(err) = self.store.create(&desired).await {
                        error!(name = %name, error = %err, "Create ClusterResourceQuota failed");
                        return Err(err);
                    }
                }
                Some(mut current) if current.spec != desired.spec => {
                    info!(name = %name, "Updating ClusterResourceQuota");
                    current.spec = desired.spec.clone();
                    if let Err(err) = self.store.update(&current).await {
                        error!(name = %name, error = %err, "Update ClusterResourceQuota failed");
                        return Err(err);
                    }
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Deletes the quota objects enumerated by the current policy list.
    ///
    /// Only indices present in the spec are visited; objects left behind by
    /// a previously longer policy list are not swept here. Fetch failures are
    /// logged and skipped, delete failures abort the pass.
    pub async fn ensure_deleted(&self, sc: &StorageCluster) -> Result<()> {
        let cluster_name = sc.name_any();
        for idx in 0..sc.spec.overprovision.len() {
            let name = storage_quota_name(&cluster_name, idx);
            match self.store.get(&name).await {
                Ok(Some(_)) => {
                    info!(name = %name, "Deleting ClusterResourceQuota");
                    if let Err(err) = self.store.delete(&name).await {
                        error!(name = %name, error = %err, "Delete ClusterResourceQuota failed");
                        return Err(err);
                    }
                }
                Ok(None) => {
                    debug!(name = %name, "ClusterResourceQuota already absent");
                }
                Err(err) => {
                    debug!(name = %name, error = %err, "Get ClusterResourceQuota failed during cleanup");
                }
            }
        }
        Ok(())
    }
}
