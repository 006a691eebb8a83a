use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Kubeconfig file to watch. Falls back to `KUBECONFIG`, then `~/.kube/config`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    #[serde(alias = "reload-interval-ms")]
    pub reload_interval_ms: u64,
    #[serde(alias = "hot-reload")]
    pub hot_reload: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { kubeconfig: None, reload_interval_ms: 2000, hot_reload: true }
    }
}
