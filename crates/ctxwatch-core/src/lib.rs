pub mod backoff;
pub mod debounce;
pub mod error;
pub mod event;
pub mod informer;
pub mod informers;
pub mod kube_informer;
pub mod kubeconfig;
pub mod manager;
pub mod publisher;
pub mod resource;
pub mod states;
#[cfg(test)]
mod testing;
mod timer;

pub use backoff::{BackoffPolicy, BackoffScheduler};
pub use debounce::DispatchDebouncer;
pub use error::{FailureKind, ManagerError};
pub use event::{ManagerEvent, RetryKey};
pub use informer::{Connector, InformerEvent, InformerHandle, InformerSink, WatchRequest};
pub use informers::InformersRegistry;
pub use kube_informer::KubeConnector;
pub use kubeconfig::{ClusterInfo, KubeConfig, KubeContext};
pub use manager::{ContextsManager, ManagerHandle, ManagerOptions};
pub use publisher::{Channel, Publisher};
pub use resource::{ResourceDescriptor, ResourceName};
pub use states::{CheckingPhase, CheckingState, ContextGeneralState, ResourcesCount, StatesRegistry, WatchedResourceList};
