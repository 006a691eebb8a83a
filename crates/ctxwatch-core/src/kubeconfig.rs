use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The subset of a kubeconfig file the manager reconciles against.
///
/// List entries are decoded one by one: an entry that does not parse is
/// dropped instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(default, deserialize_with = "lenient_list")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub users: Vec<NamedUser>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context", default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default)]
    pub cluster: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    /// Authentication attributes, kept opaque.
    #[serde(default)]
    pub user: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRef {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub name: String,
    pub server: String,
}

/// A fully resolved context: its cluster and user entries both exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeContext {
    pub name: String,
    pub cluster: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub cluster_info: ClusterInfo,
    #[serde(skip)]
    cluster_entry: NamedCluster,
    #[serde(skip)]
    user_entry: NamedUser,
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().filter_map(|entry| serde_json::from_value(entry).ok()).collect())
}

impl KubeConfig {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Contexts whose cluster (with a server) and user can both be found.
    /// When names repeat, the first entry wins.
    pub fn resolve_contexts(&self) -> IndexMap<String, KubeContext> {
        let mut resolved = IndexMap::new();
        for entry in &self.contexts {
            if resolved.contains_key(&entry.name) {
                continue;
            }
            if let Some(context) = self.resolve(entry) {
                resolved.insert(entry.name.clone(), context);
            }
        }
        resolved
    }

    fn resolve(&self, entry: &NamedContext) -> Option<KubeContext> {
        let cluster = self.clusters.iter().find(|c| c.name == entry.context.cluster)?;
        let server = cluster.cluster.get("server").and_then(Value::as_str)?;
        let user = self.users.iter().find(|u| u.name == entry.context.user)?;
        Some(KubeContext {
            name: entry.name.clone(),
            cluster: cluster.name.clone(),
            user: user.name.clone(),
            namespace: entry.context.namespace.clone().filter(|ns| !ns.is_empty()),
            cluster_info: ClusterInfo { name: cluster.name.clone(), server: server.to_string() },
            cluster_entry: cluster.clone(),
            user_entry: user.clone(),
        })
    }
}

impl KubeContext {
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or("default")
    }

    /// Two snapshots describe the same context only if cluster, user
    /// (including its auth attributes) and namespace all match.
    pub fn same_identity(&self, other: &KubeContext) -> bool {
        self.cluster_info == other.cluster_info
            && self.user == other.user
            && self.user_entry.user == other.user_entry.user
            && self.namespace == other.namespace
    }

    /// A kubeconfig holding only this context, its cluster and its user.
    pub fn to_kubeconfig(&self) -> KubeConfig {
        KubeConfig {
            clusters: vec![self.cluster_entry.clone()],
            users: vec![self.user_entry.clone()],
            contexts: vec![NamedContext {
                name: self.name.clone(),
                context: ContextRef {
                    cluster: self.cluster.clone(),
                    user: self.user.clone(),
                    namespace: self.namespace.clone(),
                },
            }],
            current_context: Some(self.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests;
