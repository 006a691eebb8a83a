use crate::informer::InformerEvent;
use crate::publisher::Channel;
use crate::resource::ResourceName;

/// Identifies a pending backoff timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RetryKey {
    /// Reconnect every primary stream of a context.
    Reconnect(String),
    /// Restart one secondary stream of the current context.
    Secondary(String, ResourceName),
}

impl RetryKey {
    pub fn context(&self) -> &str {
        match self {
            Self::Reconnect(context) | Self::Secondary(context, _) => context,
        }
    }
}

/// Everything the manager's single event queue carries.
///
/// Each message holds the generation it was issued with; a message whose
/// generation no longer matches the live stream or timer is discarded.
#[derive(Debug)]
pub enum ManagerEvent {
    Informer { context: String, resource: ResourceName, generation: u64, event: InformerEvent },
    Retry { key: RetryKey, generation: u64 },
    Dispatch { channel: Channel, generation: u64 },
}
