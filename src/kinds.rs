// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::CompileError;

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

// (api group, kinds). The core group is "".
const KIND_TABLE: &[(&str, &[&str])] = &[
    (
        "",
        &[
            "Binding",
            "ComponentStatus",
            "ConfigMap",
            "Endpoints",
            "Event",
            "LimitRange",
            "Namespace",
            "Node",
            "PersistentVolume",
            "PersistentVolumeClaim",
            "Pod",
            "PodTemplate",
            "ReplicationController",
            "ResourceQuota",
            "Secret",
            "Service",
            "ServiceAccount",
        ],
    ),
    (
        "admissionregistration.k8s.io",
        &[
            "MutatingWebhookConfiguration",
            "ValidatingAdmissionPolicy",
            "ValidatingAdmissionPolicyBinding",
            "ValidatingWebhookConfiguration",
        ],
    ),
    ("apiextensions.k8s.io", &["CustomResourceDefinition"]),
    ("apiregistration.k8s.io", &["APIService"]),
    (
        "apps",
        &[
            "ControllerRevision",
            "DaemonSet",
            "Deployment",
            "ReplicaSet",
            "StatefulSet",
        ],
    ),
    ("autoscaling", &["HorizontalPodAutoscaler"]),
    ("batch", &["CronJob", "Job"]),
    ("certificates.k8s.io", &["CertificateSigningRequest"]),
    ("coordination.k8s.io", &["Lease"]),
    ("discovery.k8s.io", &["EndpointSlice"]),
    ("flowcontrol.apiserver.k8s.io", &["FlowSchema", "PriorityLevelConfiguration"]),
    ("networking.k8s.io", &["Ingress", "IngressClass", "NetworkPolicy"]),
    ("node.k8s.io", &["RuntimeClass"]),
    ("policy", &["PodDisruptionBudget"]),
    (
        "rbac.authorization.k8s.io",
        &["ClusterRole", "ClusterRoleBinding", "Role", "RoleBinding"],
    ),
    ("scheduling.k8s.io", &["PriorityClass"]),
    (
        "storage.k8s.io",
        &[
            "CSIDriver",
            "CSINode",
            "CSIStorageCapacity",
            "StorageClass",
            "VolumeAttachment",
        ],
    ),
];

lazy_static! {
    static ref KIND_TO_GROUP: BTreeMap<&'static str, &'static str> = KIND_TABLE
        .iter()
        .flat_map(|(group, kinds)| kinds.iter().map(move |kind| (*kind, *group)))
        .collect();
}

/// API group of a built-in kind.
pub fn api_group_of(kind: &str) -> Option<&'static str> {
    KIND_TO_GROUP.get(kind).copied()
}

/// A user-declared set of kinds to match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSet {
    #[serde(default, alias = "Kinds")]
    pub kinds: Vec<String>,
}

impl KindSet {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }
}

/// Kinds sharing one API group, as used in a constraint's `match.kinds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiGroupKinds {
    pub api_group: String,
    pub kinds: BTreeSet<String>,
}

impl Serialize for ApiGroupKinds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ApiGroupKinds", 2)?;
        s.serialize_field("apiGroups", &[&self.api_group])?;
        s.serialize_field("kinds", &self.kinds)?;
        s.end()
    }
}

/// Groups the declared kinds by API group, merging duplicates.
/// Groups are ordered by name. All unknown kinds are reported together.
pub fn normalize_kinds(groups: &[KindSet]) -> Result<Vec<ApiGroupKinds>, CompileError> {
    let mut buckets: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    let mut unknown = BTreeSet::new();

    for kind in groups.iter().flat_map(|g| g.kinds.iter()) {
        match api_group_of(kind) {
            Some(group) => {
                buckets.entry(group).or_default().insert(kind.clone());
            }
            None => {
                unknown.insert(kind.clone());
            }
        }
    }

    if !unknown.is_empty() {
        return Err(CompileError::UnknownKind(unknown.into_iter().collect()));
    }

    Ok(buckets
        .into_iter()
        .map(|(group, kinds)| ApiGroupKinds {
            api_group: group.to_string(),
            kinds,
        })
        .collect())
}
