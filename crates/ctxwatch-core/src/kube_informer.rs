use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Event as CoreEvent, Node, PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client, Config};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::informer::{Connector, InformerEvent, InformerHandle, InformerSink, WatchRequest};
use crate::resource::ResourceName;

/// Connector backed by `kube::runtime::watcher`.
#[derive(Debug, Clone, Default)]
pub struct KubeConnector;

impl Connector for KubeConnector {
    fn open(&self, request: WatchRequest, sink: InformerSink) -> InformerHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let context = request.context.name.clone();
        let path = request.path.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel_clone.cancelled() => {
                    debug!(%context, %path, "Informer cancelled");
                }
                _ = run_informer(request, &sink) => {
                    debug!(%context, %path, "Informer ended");
                }
            }
        });

        InformerHandle::new(cancel)
    }
}

fn api_resource(resource: ResourceName) -> ApiResource {
    match resource {
        ResourceName::Pods => ApiResource::erase::<Pod>(&()),
        ResourceName::Deployments => ApiResource::erase::<Deployment>(&()),
        ResourceName::Services => ApiResource::erase::<Service>(&()),
        ResourceName::Ingresses => ApiResource::erase::<Ingress>(&()),
        ResourceName::Nodes => ApiResource::erase::<Node>(&()),
        ResourceName::Events => ApiResource::erase::<CoreEvent>(&()),
        ResourceName::PersistentVolumeClaims => ApiResource::erase::<PersistentVolumeClaim>(&()),
        ResourceName::ConfigMaps => ApiResource::erase::<ConfigMap>(&()),
        ResourceName::Secrets => ApiResource::erase::<Secret>(&()),
        ResourceName::Jobs => ApiResource::erase::<Job>(&()),
        ResourceName::CronJobs => ApiResource::erase::<CronJob>(&()),
        // Not part of the upstream API types.
        ResourceName::Routes => {
            let d = resource.descriptor();
            ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(d.group, d.version, d.kind), d.plural)
        }
    }
}

async fn client_for(request: &WatchRequest) -> Result<Client> {
    let yaml = serde_yaml::to_string(&request.context.to_kubeconfig())?;
    let kubeconfig = Kubeconfig::from_yaml(&yaml)?;
    let opts = KubeConfigOptions { context: Some(request.context.name.clone()), ..Default::default() };
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &opts).await?;
    config.connect_timeout = Some(request.connect_timeout);
    Ok(Client::try_from(config)?)
}

fn to_value(object: DynamicObject) -> Option<Value> {
    match serde_json::to_value(object) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to serialize watched object: {e}");
            None
        }
    }
}

/// Pumps one watch into `sink` until it fails, ends, or the manager is gone.
async fn run_informer(request: WatchRequest, sink: &InformerSink) {
    let client = match client_for(&request).await {
        Ok(client) => client,
        Err(e) => {
            sink.send(InformerEvent::Failed(e.to_string()));
            return;
        }
    };

    let ar = api_resource(request.resource);
    let api: Api<DynamicObject> = if request.resource.descriptor().namespaced {
        Api::namespaced_with(client, &request.namespace, &ar)
    } else {
        Api::all_with(client, &ar)
    };

    let stream = watcher::watcher(api, watcher::Config::default());
    tokio::pin!(stream);

    let mut initial: Vec<Value> = Vec::new();
    loop {
        let delivered = match stream.next().await {
            Some(Ok(Event::Init)) => {
                initial.clear();
                true
            }
            Some(Ok(Event::InitApply(object))) => {
                initial.extend(to_value(object));
                true
            }
            // A completed listing, first or after a re-list, replaces the list.
            Some(Ok(Event::InitDone)) => {
                sink.send(InformerEvent::Connected)
                    && initial.drain(..).all(|object| sink.send(InformerEvent::Added(object)))
            }
            Some(Ok(Event::Apply(object))) => to_value(object).map_or(true, |o| sink.send(InformerEvent::Updated(o))),
            Some(Ok(Event::Delete(object))) => to_value(object).map_or(true, |o| sink.send(InformerEvent::Deleted(o))),
            Some(Err(e)) => {
                sink.send(InformerEvent::Failed(e.to_string()));
                return;
            }
            None => {
                sink.send(InformerEvent::Failed("watch stream ended".into()));
                return;
            }
        };
        if !delivered {
            return;
        }
    }
}
