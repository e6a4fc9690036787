//! Explicit collector registration
//!
//! Collectors are constructed and registered against a caller-supplied
//! registry; nothing registers itself into process-global state.

use kube::Client;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::metrics::storage_quota::StorageQuotaCollector;

/// Constructs the custom resource collectors, starts their background cache
/// synchronization, and registers them with `registry`.
///
/// A failed client construction degrades the quota collector to a disabled
/// no-op, which has nothing to export and is skipped.
pub fn register_custom_resource_collectors(
    registry: &Registry,
    client: std::result::Result<Client, kube::Error>,
    shutdown: CancellationToken,
) -> Result<()> {
    let storage_quota_collector = StorageQuotaCollector::from_client(client);
    storage_quota_collector.run(shutdown);
    if storage_quota_collector.enabled() {
        registry.register(Box::new(storage_quota_collector))?;
        info!("Registered storage quota collector");
    }
    Ok(())
}
