//! StorageCluster controller
//!
//! Level-triggered loop over StorageCluster objects: each pass converges the
//! cluster's ClusterResourceQuota objects via the reconciler core, and the
//! deletion path removes them before releasing the finalizer. Scheduling
//! lives here; the convergence logic itself stays in [`crate::quota`].

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::crd::StorageCluster;
use crate::error::{Error, ErrorAction, Result};
use crate::quota::{KubeQuotaStore, StorageQuotaReconciler};

/// Finalizer guarding quota cleanup on StorageCluster deletion.
pub const STORAGE_QUOTA_FINALIZER: &str = "ocs.openshift.io/storage-quota";

const REQUEUE_INTERVAL: Duration = Duration::from_secs(300);
const BACKOFF_INTERVAL: Duration = Duration::from_secs(30);

/// Shared state for the controller.
pub struct ControllerContext {
    client: Client,
    reconciler: StorageQuotaReconciler<KubeQuotaStore>,
}

impl ControllerContext {
    pub fn new(client: Client) -> Self {
        let reconciler = StorageQuotaReconciler::new(KubeQuotaStore::new(client.clone()));
        Self { client, reconciler }
    }
}

#[instrument(skip_all, fields(ns = %sc.namespace().unwrap_or_default(), name = %sc.name_any()))]
async fn reconcile(sc: Arc<StorageCluster>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let ns = sc.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<StorageCluster> = Api::namespaced(ctx.client.clone(), &ns);

    if sc.meta().deletion_timestamp.is_some() {
        info!("StorageCluster deleted, removing its ClusterResourceQuota objects");
        ctx.reconciler.ensure_deleted(&sc).await?;
        remove_finalizer(&api, &sc).await?;
        return Ok(Action::await_change());
    }

    ensure_finalizer(&api, &sc).await?;
    ctx.reconciler.ensure_created(&sc).await?;

    Ok(Action::requeue(REQUEUE_INTERVAL))
}

fn error_policy(sc: Arc<StorageCluster>, err: &Error, _ctx: Arc<ControllerContext>) -> Action {
    error!(name = %sc.name_any(), error = %err, "Reconcile failed");
    match err.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(BACKOFF_INTERVAL),
        ErrorAction::RequeueAfter(duration) => Action::requeue(duration),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}

async fn ensure_finalizer(api: &Api<StorageCluster>, sc: &StorageCluster) -> Result<()> {
    if sc.finalizers().iter().any(|f| f == STORAGE_QUOTA_FINALIZER) {
        return Ok(());
    }
    let mut finalizers = sc.finalizers().to_vec();
    finalizers.push(STORAGE_QUOTA_FINALIZER.to_string());
    let patch = json!({"metadata": {"finalizers": finalizers}});
    api.patch(&sc.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

async fn remove_finalizer(api: &Api<StorageCluster>, sc: &StorageCluster) -> Result<()> {
    if !sc.finalizers().iter().any(|f| f == STORAGE_QUOTA_FINALIZER) {
        return Ok(());
    }
    let finalizers = sc
        .finalizers()
        .iter()
        .filter(|f| *f != STORAGE_QUOTA_FINALIZER)
        .cloned()
        .collect::<Vec<_>>();
    let patch = json!({"metadata": {"finalizers": finalizers}});
    api.patch(&sc.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Runs the StorageCluster controller until a shutdown signal arrives.
pub async fn run_controller(client: Client) -> Result<()> {
    let storage_clusters: Api<StorageCluster> = Api::all(client.clone());
    let ctx = Arc::new(ControllerContext::new(client));

    info!("Starting StorageCluster controller");
    Controller::new(storage_clusters, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!(name = %obj.name, "Reconciled StorageCluster"),
                Err(err) => warn!(error = %err, "Controller error"),
            }
        })
        .await;

    info!("StorageCluster controller stopped");
    Ok(())
}
