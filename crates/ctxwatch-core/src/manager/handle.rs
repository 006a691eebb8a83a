use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::ContextsManager;
use crate::error::ManagerError;
use crate::informer::Connector;
use crate::kubeconfig::KubeConfig;
use crate::publisher::Publisher;
use crate::resource::ResourceName;

#[derive(Debug)]
pub enum ManagerCommand {
    Update(KubeConfig),
    Register(ResourceName),
    Unregister(ResourceName),
    Refresh { context: String, reply: oneshot::Sender<Result<(), ManagerError>> },
    Dispose,
}

/// Cloneable handle to a manager running on its own task. The manager is
/// disposed when `dispose` is called or every handle is dropped.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::UnboundedSender<ManagerCommand>,
}

impl ManagerHandle {
    pub fn update(&self, config: KubeConfig) -> bool {
        self.tx.send(ManagerCommand::Update(config)).is_ok()
    }

    pub fn register(&self, resource: ResourceName) -> bool {
        self.tx.send(ManagerCommand::Register(resource)).is_ok()
    }

    pub fn unregister(&self, resource: ResourceName) -> bool {
        self.tx.send(ManagerCommand::Unregister(resource)).is_ok()
    }

    pub async fn refresh(&self, context: &str) -> Result<(), ManagerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ManagerCommand::Refresh { context: context.to_string(), reply })
            .map_err(|_| ManagerError::Stopped)?;
        rx.await.map_err(|_| ManagerError::Stopped)?
    }

    pub fn dispose(&self) {
        let _ = self.tx.send(ManagerCommand::Dispose);
    }
}

impl<C: Connector, P: Publisher> ContextsManager<C, P> {
    /// Moves the manager onto a tokio task.
    pub fn spawn(self) -> (ManagerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (ManagerHandle { tx }, task)
    }

    /// Serves commands and queued events until disposed.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ManagerCommand>) {
        let Some(mut events) = self.events.take() else { return };
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ManagerCommand::Dispose) | None => break,
                    Some(command) => self.apply(command),
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }
        self.dispose();
        debug!("Contexts manager task finished");
    }

    fn apply(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Update(config) => self.update(&config),
            ManagerCommand::Register(resource) => self.register_get_current_context_resources(resource),
            ManagerCommand::Unregister(resource) => self.unregister_get_current_context_resources(resource),
            ManagerCommand::Refresh { context, reply } => {
                let _ = reply.send(self.refresh_context_state(&context));
            }
            ManagerCommand::Dispose => self.dispose(),
        }
    }
}
