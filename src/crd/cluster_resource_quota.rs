//! ClusterResourceQuota resource (quota.openshift.io/v1)
//!
//! Cluster-scoped quota-tracking resource. The wire shape must match the
//! external quota system exactly: `spec.selector`, `spec.quota.hard`, and
//! the externally-maintained `status.total.hard` / `status.total.used`
//! resource lists.

use k8s_openapi::api::core::v1::{ResourceQuotaSpec, ResourceQuotaStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired hard limits for a set of namespaces matched by the selector.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "quota.openshift.io",
    version = "v1",
    kind = "ClusterResourceQuota",
    plural = "clusterresourcequotas",
    status = "ClusterResourceQuotaStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceQuotaSpec {
    /// Selects the namespaces this quota is measured against.
    pub selector: ClusterResourceQuotaSelector,

    /// The quota restrictions to enforce across the selected namespaces.
    pub quota: ResourceQuotaSpec,
}

/// Namespace selection for a ClusterResourceQuota.
///
/// Both fields are optional on the wire; an empty selector matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceQuotaSelector {
    /// Label selector over namespaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelSelector>,

    /// Annotation key/value match over namespaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// Observed usage, aggregated by the external quota system. This operator
/// only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceQuotaStatus {
    /// Aggregate hard limits and usage across all selected namespaces.
    #[serde(default)]
    pub total: ResourceQuotaStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    #[test]
    fn test_spec_wire_shape() {
        let spec = ClusterResourceQuotaSpec {
            selector: ClusterResourceQuotaSelector {
                labels: Some(LabelSelector {
                    match_labels: Some(BTreeMap::from([(
                        "team".to_string(),
                        "storage".to_string(),
                    )])),
                    ..Default::default()
                }),
                annotations: None,
            },
            quota: ResourceQuotaSpec {
                hard: Some(BTreeMap::from([(
                    "requests.storage".to_string(),
                    Quantity("3Ti".to_string()),
                )])),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["quota"]["hard"]["requests.storage"], "3Ti");
        assert_eq!(json["selector"]["labels"]["matchLabels"]["team"], "storage");
        // Absent annotations must not serialize.
        assert!(json["selector"].get("annotations").is_none());
    }

    #[test]
    fn test_status_deserializes_external_totals() {
        let status: ClusterResourceQuotaStatus = serde_json::from_value(serde_json::json!({
            "total": {
                "hard": {"requests.storage": "5Ti"},
                "used": {"requests.storage": "1Ti"}
            }
        }))
        .unwrap();

        let hard = status.total.hard.unwrap();
        assert_eq!(hard["requests.storage"], Quantity("5Ti".to_string()));
    }
}
