//! Object-store seam for ClusterResourceQuota resources
//!
//! The reconciler talks to the cluster only through [`QuotaStore`], which
//! folds the API's "not found" into `None` so callers branch on presence
//! rather than on status codes. Tests substitute an in-memory store.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};
use std::sync::Arc;

use crate::crd::ClusterResourceQuota;
use crate::error::Result;

/// Access to cluster-scoped ClusterResourceQuota objects by name.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Fetch by name; `None` when the object does not exist.
    async fn get(&self, name: &str) -> Result<Option<ClusterResourceQuota>>;

    /// Create a new object.
    async fn create(&self, quota: &ClusterResourceQuota) -> Result<ClusterResourceQuota>;

    /// Replace an existing object.
    async fn update(&self, quota: &ClusterResourceQuota) -> Result<ClusterResourceQuota>;

    /// Delete by name.
    async fn delete(&self, name: &str) -> Result<()>;
}

#[async_trait]
impl<S: QuotaStore + ?Sized> QuotaStore for Arc<S> {
    async fn get(&self, name: &str) -> Result<Option<ClusterResourceQuota>> {
        (**self).get(name).await
    }

    async fn create(&self, quota: &ClusterResourceQuota) -> Result<ClusterResourceQuota> {
        (**self).create(quota).await
    }

    async fn update(&self, quota: &ClusterResourceQuota) -> Result<ClusterResourceQuota> {
        (**self).update(quota).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        (**self).delete(name).await
    }
}

/// QuotaStore backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeQuotaStore {
    api: Api<ClusterResourceQuota>,
}

impl KubeQuotaStore {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl QuotaStore for KubeQuotaStore {
    async fn get(&self, name: &str) -> Result<Option<ClusterResourceQuota>> {
        Ok(self.api.get_opt(name).await?)
    }

    async fn create(&self, quota: &ClusterResourceQuota) -> Result<ClusterResourceQuota> {
        Ok(self.api.create(&PostParams::default(), quota).await?)
    }

    async fn update(&self, quota: &ClusterResourceQuota) -> Result<ClusterResourceQuota> {
        let name = quota.name_any();
        Ok(self.api.replace(&name, &PostParams::default(), quota).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}
