mod kubeconfig_path;
mod publisher;
mod settings;
mod source;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use ctxwatch_config::AppConfig;
use ctxwatch_core::{ContextsManager, KubeConfig, KubeConnector, ResourceName};
use tracing::{info, warn};

use crate::publisher::JsonLinesPublisher;
use crate::source::KubeconfigSource;

/// Watches every context of a kubeconfig file and prints their state as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "ctxwatch", version)]
struct Args {
    /// Settings file. Defaults to the user config directory.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Kubeconfig file to watch.
    #[arg(long, value_name = "FILE")]
    kubeconfig: Option<PathBuf>,

    /// Resource kind to stream for the current context. May be repeated.
    #[arg(long = "watch", value_name = "RESOURCE")]
    watch: Vec<ResourceName>,

    /// Write the default settings file and exit.
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if args.init_config {
        let path = AppConfig::init_default()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load(),
    };

    let path = kubeconfig_path::locate(args.kubeconfig.as_deref(), config.general.kubeconfig.as_deref())
        .context("no kubeconfig file found")?;
    info!(path = %path.display(), "Using kubeconfig");

    let manager =
        ContextsManager::new(KubeConnector, JsonLinesPublisher::stdout(), settings::manager_options(&config.contexts));
    let (handle, task) = manager.spawn();

    let mut source = KubeconfigSource::new(path);
    let initial = source.load().unwrap_or_else(|e| {
        warn!("Failed to load kubeconfig: {e:#}");
        KubeConfig::default()
    });
    handle.update(initial);
    for resource in &args.watch {
        handle.register(*resource);
    }

    let reload_interval = Duration::from_millis(config.reload_interval_ms().max(100));
    let mut reload = tokio::time::interval(reload_interval);
    reload.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for ctrl-c: {e}");
                }
                break;
            }
            _ = reload.tick(), if config.general.hot_reload => {
                if let Some(kubeconfig) = source.poll() {
                    info!("Kubeconfig changed, reconciling contexts");
                    handle.update(kubeconfig);
                }
            }
        }
    }

    handle.dispose();
    task.await?;
    Ok(())
}
