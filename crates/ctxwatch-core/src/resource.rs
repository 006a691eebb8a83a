use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceName {
    Pods,
    Deployments,
    Services,
    Ingresses,
    Routes,
    Nodes,
    Events,
    PersistentVolumeClaims,
    ConfigMaps,
    Secrets,
    Jobs,
    CronJobs,
}

/// Static description of how one resource kind is addressed on the API server.
#[derive(Debug)]
pub struct ResourceDescriptor {
    pub name: ResourceName,
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub namespaced: bool,
    filter: Option<fn(&Value) -> bool>,
}

const fn descriptor(
    name: ResourceName,
    group: &'static str,
    version: &'static str,
    kind: &'static str,
    plural: &'static str,
    namespaced: bool,
) -> ResourceDescriptor {
    ResourceDescriptor { name, group, version, kind, plural, namespaced, filter: None }
}

static DESCRIPTORS: [ResourceDescriptor; 12] = [
    descriptor(ResourceName::Pods, "", "v1", "Pod", "pods", true),
    descriptor(ResourceName::Deployments, "apps", "v1", "Deployment", "deployments", true),
    descriptor(ResourceName::Services, "", "v1", "Service", "services", true),
    descriptor(ResourceName::Ingresses, "networking.k8s.io", "v1", "Ingress", "ingresses", true),
    descriptor(ResourceName::Routes, "route.openshift.io", "v1", "Route", "routes", true),
    descriptor(ResourceName::Nodes, "", "v1", "Node", "nodes", false),
    ResourceDescriptor {
        name: ResourceName::Events,
        group: "",
        version: "v1",
        kind: "Event",
        plural: "events",
        namespaced: true,
        filter: Some(involves_tracked_kind),
    },
    descriptor(ResourceName::PersistentVolumeClaims, "", "v1", "PersistentVolumeClaim", "persistentvolumeclaims", true),
    descriptor(ResourceName::ConfigMaps, "", "v1", "ConfigMap", "configmaps", true),
    descriptor(ResourceName::Secrets, "", "v1", "Secret", "secrets", true),
    descriptor(ResourceName::Jobs, "batch", "v1", "Job", "jobs", true),
    descriptor(ResourceName::CronJobs, "batch", "v1", "CronJob", "cronjobs", true),
];

/// Events are only kept when they concern an object of a kind we track.
fn involves_tracked_kind(object: &Value) -> bool {
    let Some(kind) = object.pointer("/involvedObject/kind").and_then(Value::as_str) else {
        return false;
    };
    ResourceName::ALL.iter().any(|r| *r != ResourceName::Events && r.descriptor().kind == kind)
}

impl ResourceName {
    pub const ALL: [ResourceName; 12] = [
        Self::Pods,
        Self::Deployments,
        Self::Services,
        Self::Ingresses,
        Self::Routes,
        Self::Nodes,
        Self::Events,
        Self::PersistentVolumeClaims,
        Self::ConfigMaps,
        Self::Secrets,
        Self::Jobs,
        Self::CronJobs,
    ];

    /// Watched for every configured context to establish reachability.
    pub const PRIMARY: [ResourceName; 2] = [Self::Pods, Self::Deployments];

    pub fn descriptor(self) -> &'static ResourceDescriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.descriptor().plural
    }

    pub fn is_primary(self) -> bool {
        Self::PRIMARY.contains(&self)
    }

    /// Collection path on the API server, used as the informer registry key.
    pub fn path(self, namespace: &str) -> String {
        let d = self.descriptor();
        let prefix = if d.group.is_empty() {
            format!("/api/{}", d.version)
        } else {
            format!("/apis/{}/{}", d.group, d.version)
        };
        if d.namespaced {
            format!("{prefix}/namespaces/{namespace}/{}", d.plural)
        } else {
            format!("{prefix}/{}", d.plural)
        }
    }
}

impl ResourceDescriptor {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn accepts(&self, object: &Value) -> bool {
        self.filter.map_or(true, |filter| filter(object))
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|r| r.as_str() == lower).ok_or_else(|| format!("unknown resource '{s}'"))
    }
}
