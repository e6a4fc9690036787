//! StorageCluster CRD
//!
//! Declares the storage cluster's device sets (capacity inputs) and the
//! overprovision policies reconciled into ClusterResourceQuota objects.

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::cluster_resource_quota::ClusterResourceQuotaSelector;

// =============================================================================
// StorageCluster CRD
// =============================================================================

/// StorageCluster describes the declared capacity of a storage cluster and
/// the overprovision policies scoping storage quota over it.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ocs.openshift.io",
    version = "v1",
    kind = "StorageCluster",
    plural = "storageclusters",
    status = "StorageClusterStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// Homogeneous groups of storage devices backing the cluster.
    #[serde(default)]
    pub storage_device_sets: Vec<StorageDeviceSet>,

    /// Quota policies, one ClusterResourceQuota per entry, positionally named.
    #[serde(default)]
    pub overprovision: Vec<OverprovisionSpec>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// One homogeneous group of storage devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageDeviceSet {
    /// Device set name.
    pub name: String,

    /// Number of devices per replica.
    #[serde(default)]
    pub count: i32,

    /// Replication factor applied to each device's capacity.
    #[serde(default)]
    pub replica: i32,

    /// Template for the claims backing each device; its storage request is
    /// the per-unit capacity input.
    #[serde(rename = "dataPVCTemplate")]
    pub data_pvc_template: PersistentVolumeClaim,

    /// Whether devices may move between nodes.
    #[serde(default)]
    pub portable: bool,

    /// Device media type (ssd, hdd, nvme).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl StorageDeviceSet {
    /// The per-unit storage request from the claim template, when present.
    pub fn storage_request(&self) -> Option<&Quantity> {
        self.data_pvc_template
            .spec
            .as_ref()?
            .resources
            .as_ref()?
            .requests
            .as_ref()?
            .get("storage")
    }
}

/// A rule mapping a storage class (or the default) and a namespace selector
/// to a hard storage limit.
///
/// An explicit capacity wins over a percentage when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverprovisionSpec {
    /// Storage class the quota applies to; empty means the unqualified
    /// `requests.storage` resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    /// Explicit hard limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Quantity>,

    /// Percentage over useable capacity used when no explicit capacity is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,

    /// Namespaces the resulting quota applies to, copied verbatim into the
    /// ClusterResourceQuota.
    #[serde(default)]
    pub selector: ClusterResourceQuotaSelector,
}

// =============================================================================
// Status
// =============================================================================

/// Status of the StorageCluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterStatus {
    /// Current lifecycle phase, maintained by the wider cluster controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PersistentVolumeClaimSpec, VolumeResourceRequirements};
    use std::collections::BTreeMap;

    fn pvc_with_request(quantity: &str) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            spec: Some(PersistentVolumeClaimSpec {
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(quantity.to_string()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_storage_request() {
        let ds = StorageDeviceSet {
            name: "set0".to_string(),
            replica: 2,
            data_pvc_template: pvc_with_request("1Ti"),
            ..Default::default()
        };
        assert_eq!(ds.storage_request(), Some(&Quantity("1Ti".to_string())));

        let empty = StorageDeviceSet::default();
        assert_eq!(empty.storage_request(), None);
    }

    #[test]
    fn test_device_set_wire_field_names() {
        let ds = StorageDeviceSet {
            name: "set0".to_string(),
            data_pvc_template: pvc_with_request("512Gi"),
            device_type: Some("ssd".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&ds).unwrap();
        // The claim template key is dataPVCTemplate, not dataPvcTemplate.
        assert!(json.get("dataPVCTemplate").is_some());
        assert_eq!(json["deviceType"], "ssd");
    }
}
