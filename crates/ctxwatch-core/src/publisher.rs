use std::fmt;

use serde_json::Value;

use crate::resource::ResourceName;

/// Named output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    GeneralState,
    CheckingState,
    CurrentContextGeneralState,
    CurrentContextResource(ResourceName),
}

impl Channel {
    pub fn name(&self) -> String {
        match self {
            Self::GeneralState => "contexts-general-state-update".into(),
            Self::CheckingState => "contexts-checking-state-update".into(),
            Self::CurrentContextGeneralState => "current-context-general-state-update".into(),
            Self::CurrentContextResource(resource) => format!("current-context-{resource}-update"),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Receives published snapshots. Fire-and-forget: the payload is an owned
/// copy and publishing cannot fail from the manager's point of view.
pub trait Publisher: Send + 'static {
    fn publish(&self, channel: Channel, payload: Value);
}
