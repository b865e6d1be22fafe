//! Remote target: commands are injected as scripts into an isolated context

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use cb_core::{BootstrapConfig, BridgeResult, MountId};
use cb_data::Dataset;

use super::{ContextKind, CreateSpec, Mountable, RenderTarget};
use crate::codec::encode_options;
use crate::command::{Command, CommandKind, ScriptCodec};

/// One-way, ordered delivery of commands into a remote context
pub trait ScriptInjector: Send {
    fn inject(&self, command: &Command);
}

/// Adapter turning a closure into an injector
pub struct FnInjector<F>(pub F);

impl<F> ScriptInjector for FnInjector<F>
where
    F: Fn(&Command) + Send,
{
    fn inject(&self, command: &Command) {
        (self.0)(command)
    }
}

/// Injector feeding an unbounded channel drained by the host's view layer
#[derive(Debug, Clone)]
pub struct ChannelInjector {
    sender: mpsc::UnboundedSender<Command>,
}

impl ChannelInjector {
    pub fn new(sender: mpsc::UnboundedSender<Command>) -> Self {
        Self { sender }
    }

    /// Injector plus the receiving end the host drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl ScriptInjector for ChannelInjector {
    fn inject(&self, command: &Command) {
        if self.sender.send(command.clone()).is_err() {
            tracing::warn!("Remote view is gone; dropping {} command", command.kind().name());
        }
    }
}

/// A remote context (embedded web view) and the channel into it
pub struct RemoteMount {
    id: MountId,
    injector: Box<dyn ScriptInjector>,
}

impl RemoteMount {
    pub fn new(id: MountId, injector: impl ScriptInjector + 'static) -> Self {
        Self {
            id,
            injector: Box::new(injector),
        }
    }
}

impl fmt::Debug for RemoteMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMount").field("id", &self.id).finish()
    }
}

impl Mountable for RemoteMount {
    fn mount_id(&self) -> MountId {
        self.id
    }
}

/// Drives a chart living in a remote context
#[derive(Debug)]
pub struct RemoteTarget {
    codec: ScriptCodec,
    mount: Option<RemoteMount>,
    sent: u64,
    /// Teardown requested while no view was attached
    pending_destroy: bool,
}

impl RemoteTarget {
    pub fn new(bootstrap: BootstrapConfig) -> Self {
        Self {
            codec: ScriptCodec::new(bootstrap),
            mount: None,
            sent: 0,
            pending_destroy: false,
        }
    }

    /// Commands injected so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// A destroy is waiting for the next attached view
    pub fn has_pending_destroy(&self) -> bool {
        self.pending_destroy
    }

    pub fn codec(&self) -> &ScriptCodec {
        &self.codec
    }

    fn send(&mut self, kind: CommandKind) -> BridgeResult<()> {
        let Some(mount) = self.mount.as_ref() else {
            tracing::warn!("WebView reference is not set; skipping {}", kind.name());
            return Ok(());
        };
        let command = self.codec.build(kind)?;
        tracing::debug!(
            "Injecting {} into {} ({} bytes)",
            command.kind().name(),
            mount.id,
            command.script().len()
        );
        mount.injector.inject(&command);
        self.sent += 1;
        Ok(())
    }
}

impl Default for RemoteTarget {
    fn default() -> Self {
        Self::new(BootstrapConfig::default())
    }
}

impl RenderTarget for RemoteTarget {
    type Mount = RemoteMount;

    fn context(&self) -> ContextKind {
        ContextKind::Remote
    }

    fn ready_on_attach(&self) -> bool {
        false
    }

    fn attach(&mut self, mount: RemoteMount) {
        tracing::debug!("Attaching remote target to {}", mount.id);
        self.mount = Some(mount);
        if std::mem::take(&mut self.pending_destroy) {
            if let Err(err) = self.send(CommandKind::Destroy) {
                tracing::warn!("Deferred destroy could not be sent: {}", err);
            }
        }
    }

    fn detach(&mut self) -> Option<RemoteMount> {
        self.mount.take()
    }

    fn is_attached(&self) -> bool {
        self.mount.is_some()
    }

    fn create(&mut self, spec: &CreateSpec<'_>) -> BridgeResult<()> {
        let options_json = encode_options(spec.options)?;
        self.send(CommandKind::Create {
            options_json,
            data: spec.data.clone(),
            background: spec.background.to_string(),
            sources: spec.sources.to_vec(),
        })
    }

    fn set_data(&mut self, data: &Dataset) -> BridgeResult<()> {
        self.send(CommandKind::SetData(data.clone()))
    }

    fn push_point(&mut self, point: &[f64], _data: &Dataset) -> BridgeResult<()> {
        self.send(CommandKind::PushPoint(point.to_vec()))
    }

    fn replace_window(&mut self, data: &Dataset) -> BridgeResult<()> {
        self.send(CommandKind::ReplaceWindow(data.clone()))
    }

    fn set_scale(&mut self, axis: &str, scale: &Value) -> BridgeResult<()> {
        self.send(CommandKind::SetScale {
            axis: axis.to_string(),
            scale: scale.clone(),
        })
    }

    fn set_size(&mut self, width: f64, height: f64) -> BridgeResult<()> {
        self.send(CommandKind::SetSize { width, height })
    }

    fn set_variable(&mut self, name: &str, value: &Value) -> BridgeResult<()> {
        self.send(CommandKind::SetVariable {
            name: name.to_string(),
            value: value.clone(),
        })
    }

    fn destroy(&mut self) -> BridgeResult<()> {
        if self.mount.is_none() {
            tracing::debug!("No remote view attached; destroy deferred until the next attach");
            self.pending_destroy = true;
            return Ok(());
        }
        self.send(CommandKind::Destroy)
    }
}
