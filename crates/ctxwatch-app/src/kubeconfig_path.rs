use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Finds the kubeconfig file: explicit flag, then the settings file, then the
/// first existing `KUBECONFIG` entry, then `~/.kube/config`.
pub fn locate(flag: Option<&Path>, configured: Option<&str>) -> Option<PathBuf> {
    let env = std::env::var_os("KUBECONFIG");
    resolve(flag, configured, env.as_deref(), dirs::home_dir().as_deref())
}

fn resolve(flag: Option<&Path>, configured: Option<&str>, env: Option<&OsStr>, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Some(path) = configured.filter(|p| !p.is_empty()) {
        return Some(expand_home(path, home));
    }
    if let Some(paths) = env {
        if let Some(path) = std::env::split_paths(paths).filter(|p| !p.as_os_str().is_empty()).find(|p| p.exists()) {
            return Some(path);
        }
    }
    home.map(|h| h.join(".kube").join("config"))
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
