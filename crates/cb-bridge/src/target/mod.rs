//! Render targets: where chart operations actually execute
//!
//! A [`Chart`](crate::Chart) owns the canonical state and decides *what*
//! changes; the target it is given decides *where* that change is applied.

use serde_json::Value;

use cb_core::{BridgeResult, MountId};
use cb_data::Dataset;

mod in_process;
mod remote;

pub use in_process::{ElementMount, EngineFactory, InProcessTarget, PlotEngine};
pub use remote::{ChannelInjector, FnInjector, RemoteMount, RemoteTarget, ScriptInjector};

/// Which execution context a target drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    InProcess,
    Remote,
}

/// A mount handed over by the host
pub trait Mountable {
    fn mount_id(&self) -> MountId;
}

/// Everything needed to construct an engine instance
#[derive(Debug, Clone, Copy)]
pub struct CreateSpec<'a> {
    /// Final options, already sized to the plot area
    pub options: &'a Value,
    pub data: &'a Dataset,
    pub background: &'a str,
    /// Raw remote source registering named functions
    pub sources: &'a [String],
}

/// Execution context for chart operations
pub trait RenderTarget {
    type Mount: Mountable;

    fn context(&self) -> ContextKind;

    /// Whether attaching a mount is enough to create an instance.
    ///
    /// Remote targets wait for their page to finish loading instead.
    fn ready_on_attach(&self) -> bool;

    fn attach(&mut self, mount: Self::Mount);

    fn detach(&mut self) -> Option<Self::Mount>;

    fn is_attached(&self) -> bool;

    fn create(&mut self, spec: &CreateSpec<'_>) -> BridgeResult<()>;

    /// Full replacement of the rendered dataset
    fn set_data(&mut self, data: &Dataset) -> BridgeResult<()>;

    /// One point appended; `data` is the canonical store after the append
    fn push_point(&mut self, point: &[f64], data: &Dataset) -> BridgeResult<()>;

    /// The canonical store after a destructive slice
    fn replace_window(&mut self, data: &Dataset) -> BridgeResult<()>;

    fn set_scale(&mut self, axis: &str, scale: &Value) -> BridgeResult<()>;

    fn set_size(&mut self, width: f64, height: f64) -> BridgeResult<()>;

    fn set_variable(&mut self, name: &str, value: &Value) -> BridgeResult<()>;

    /// Release the instance and drop anything waiting for it
    fn destroy(&mut self) -> BridgeResult<()>;
}
