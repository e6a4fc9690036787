//! Storage quota usage collector
//!
//! A custom Prometheus collector summing hard and used storage totals across
//! every ClusterResourceQuota in the cluster. A reflector keeps a local cache
//! in sync from a cluster-wide list+watch; the collect path only reads the
//! cache snapshot and never touches the network.

use futures::stream::BoxStream;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::reflector::{self, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::crd::ClusterResourceQuota;
use crate::quota::{approx_f64, RESOURCE_STORAGE};

type QuotaWatch = BoxStream<'static, std::result::Result<ClusterResourceQuota, watcher::Error>>;

/// Watch-backed cache plus the not-yet-started watch stream.
struct QuotaCache {
    reader: Store<ClusterResourceQuota>,
    watch: Mutex<Option<QuotaWatch>>,
}

/// Prometheus collector for ClusterResourceQuota storage totals.
///
/// Enabled or disabled is fixed at construction: a collector built without a
/// usable client permanently describes and collects nothing instead of
/// failing the process.
pub struct StorageQuotaCollector {
    quota_hard: Gauge,
    quota_used: Gauge,
    cache: Option<QuotaCache>,
}

impl StorageQuotaCollector {
    /// Collector backed by a cluster-wide watch over ClusterResourceQuota.
    pub fn new(client: Client) -> Self {
        let api: Api<ClusterResourceQuota> = Api::all(client);
        let (reader, writer) = reflector::store();
        let watch = reflector::reflector(writer, watcher(api, watcher::Config::default()))
            .default_backoff()
            .touched_objects()
            .boxed();

        Self {
            cache: Some(QuotaCache {
                reader,
                watch: Mutex::new(Some(watch)),
            }),
            ..Self::disabled()
        }
    }

    /// Collector that reports nothing.
    pub fn disabled() -> Self {
        Self {
            quota_hard: storage_gauge(
                "ocs_clusterresourcequota_storage_hard",
                "Hard-limit total for ClusterResourceQuota:storage",
            ),
            quota_used: storage_gauge(
                "ocs_clusterresourcequota_storage_used",
                "Currently-used total for ClusterResourceQuota:storage",
            ),
            cache: None,
        }
    }

    /// Builds from a client-construction result, degrading to a disabled
    /// collector when the client configuration was unusable.
    pub fn from_client(client: std::result::Result<Client, kube::Error>) -> Self {
        match client {
            Ok(client) => Self::new(client),
            Err(err) => {
                warn!(error = %err, "Failed to build quota client, storage quota metrics disabled");
                Self::disabled()
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Starts the background cache synchronization. The cache begins empty
    /// and converges as list+watch events arrive; after `shutdown` fires the
    /// last snapshot keeps serving. No-op when disabled.
    pub fn run(&self, shutdown: CancellationToken) {
        let Some(cache) = &self.cache else { return };
        let watch = match cache.watch.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(mut watch) = watch else {
            warn!("Storage quota watch already running");
            return;
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = watch.next() => match event {
                        Some(Ok(quota)) => {
                            trace!(name = %quota.name_any(), "ClusterResourceQuota cache updated");
                        }
                        // Watch errors stall the cache; collect keeps serving
                        // the last snapshot.
                        Some(Err(err)) => {
                            warn!(error = %err, "ClusterResourceQuota watch error");
                        }
                        None => break,
                    },
                }
            }
        });
    }

    fn collect_sum_storage_quotas(&self, cache: &QuotaCache) -> (f64, f64) {
        let snapshot = cache.reader.state();
        sum_storage_quotas(snapshot.iter().map(|quota| quota.as_ref()))
    }

    #[cfg(test)]
    fn with_store(reader: Store<ClusterResourceQuota>) -> Self {
        Self {
            cache: Some(QuotaCache {
                reader,
                watch: Mutex::new(None),
            }),
            ..Self::disabled()
        }
    }
}

impl Collector for StorageQuotaCollector {
    fn desc(&self) -> Vec<&Desc> {
        if self.cache.is_none() {
            return Vec::new();
        }
        let mut descs = self.quota_hard.desc();
        descs.extend(self.quota_used.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let Some(cache) = &self.cache else {
            return Vec::new();
        };
        let (hard, used) = self.collect_sum_storage_quotas(cache);
        self.quota_hard.set(hard);
        self.quota_used.set(used);

        let mut families = self.quota_hard.collect();
        families.extend(self.quota_used.collect());
        families
    }
}

/// Sum hard and used storage totals across quota objects.
///
/// Resource keys qualify by containing the storage marker substring, so both
/// the bare `requests.storage` key and storage-class-qualified keys count.
pub fn sum_storage_quotas<'a, I>(quotas: I) -> (f64, f64)
where
    I: IntoIterator<Item = &'a ClusterResourceQuota>,
{
    let mut hard = 0.0;
    let mut used = 0.0;
    for quota in quotas {
        let Some(status) = &quota.status else { continue };
        if let Some(totals) = &status.total.hard {
            for (resource, quantity) in totals {
                if is_storage_resource(resource) {
                    hard += approx_f64(quantity);
                }
            }
        }
        if let Some(totals) = &status.total.used {
            for (resource, quantity) in totals {
                if is_storage_resource(resource) {
                    used += approx_f64(quantity);
                }
            }
        }
    }
    (hard, used)
}

fn is_storage_resource(resource: &str) -> bool {
    resource.contains(RESOURCE_STORAGE)
}

fn storage_gauge(name: &str, help: &str) -> Gauge {
    Gauge::with_opts(Opts::new(name, help)).expect("static gauge opts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ClusterResourceQuotaSpec, ClusterResourceQuotaStatus};
    use k8s_openapi::api::core::v1::ResourceQuotaStatus;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    const TIB: f64 = (1u64 << 40) as f64;

    fn quota_with_totals(
        name: &str,
        hard: &[(&str, &str)],
        used: &[(&str, &str)],
    ) -> ClusterResourceQuota {
        let to_list = |entries: &[(&str, &str)]| {
            Some(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
                    .collect::<BTreeMap<_, _>>(),
            )
        };
        let mut quota = ClusterResourceQuota::new(name, ClusterResourceQuotaSpec::default());
        quota.status = Some(ClusterResourceQuotaStatus {
            total: ResourceQuotaStatus {
                hard: to_list(hard),
                used: to_list(used),
            },
        });
        quota
    }

    #[test]
    fn test_sum_storage_quotas() {
        let quotas = vec![
            quota_with_totals(
                "q1",
                &[("requests.storage", "5Ti"), ("requests.cpu", "40")],
                &[("requests.storage", "1Ti")],
            ),
            quota_with_totals(
                "q2",
                &[("a.storageclass.storage.k8s.io/requests.storage", "3Ti")],
                &[("a.storageclass.storage.k8s.io/requests.storage", "2Ti")],
            ),
        ];

        let (hard, used) = sum_storage_quotas(quotas.iter());
        // Bare and class-qualified keys both match; requests.cpu does not.
        assert_eq!(hard, 8.0 * TIB);
        assert_eq!(used, 3.0 * TIB);
    }

    #[test]
    fn test_sum_skips_quotas_without_status() {
        let quota = ClusterResourceQuota::new("bare", ClusterResourceQuotaSpec::default());
        let (hard, used) = sum_storage_quotas(std::iter::once(&quota));
        assert_eq!(hard, 0.0);
        assert_eq!(used, 0.0);
    }

    #[test]
    fn test_disabled_collector_reports_nothing() {
        let collector = StorageQuotaCollector::disabled();
        assert!(!collector.enabled());
        assert!(collector.desc().is_empty());
        assert!(collector.collect().is_empty());
    }

    #[test]
    fn test_enabled_collector_emits_totals_from_cache() {
        let (reader, mut writer) = reflector::store();
        writer.apply_watcher_event(&watcher::Event::Applied(quota_with_totals(
            "q1",
            &[("requests.storage", "5Ti")],
            &[("requests.storage", "2Ti")],
        )));
        writer.apply_watcher_event(&watcher::Event::Applied(quota_with_totals(
            "q2",
            &[("a.storageclass.storage.k8s.io/requests.storage", "3Ti")],
            &[],
        )));

        let collector = StorageQuotaCollector::with_store(reader);
        assert_eq!(collector.desc().len(), 2);

        let families = collector.collect();
        assert_eq!(families.len(), 2);

        let value_of = |name: &str| {
            families
                .iter()
                .find(|f| f.get_name() == name)
                .map(|f| f.get_metric()[0].get_gauge().get_value())
                .unwrap()
        };
        assert_eq!(value_of("ocs_clusterresourcequota_storage_hard"), 8.0 * TIB);
        assert_eq!(value_of("ocs_clusterresourcequota_storage_used"), 2.0 * TIB);
    }
}
