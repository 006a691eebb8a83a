use std::path::PathBuf;

use anyhow::Context as _;
use ctxwatch_core::KubeConfig;
use tracing::{debug, warn};

/// The kubeconfig file, re-read on every poll and parsed only when its
/// contents changed.
pub struct KubeconfigSource {
    path: PathBuf,
    last: Option<String>,
}

impl KubeconfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path, last: None }
    }

    pub fn load(&mut self) -> anyhow::Result<KubeConfig> {
        let text = std::fs::read_to_string(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        self.last = Some(text.clone());
        KubeConfig::from_yaml(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    /// New configuration when the file changed since the last read. A file that
    /// disappeared yields an empty configuration; one that no longer parses is
    /// skipped until it changes again.
    pub fn poll(&mut self) -> Option<KubeConfig> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                if self.last.take().is_some() {
                    warn!(path = %self.path.display(), "Kubeconfig is no longer readable: {e}");
                    return Some(KubeConfig::default());
                }
                return None;
            }
        };
        if self.last.as_deref() == Some(text.as_str()) {
            return None;
        }
        debug!(path = %self.path.display(), "Kubeconfig contents changed");
        let parsed = KubeConfig::from_yaml(&text);
        self.last = Some(text);
        match parsed {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring unparsable kubeconfig: {e:#}");
                None
            }
        }
    }
}
