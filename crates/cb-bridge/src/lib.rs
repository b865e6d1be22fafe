//! Chart bridge: one control surface, two execution contexts
//!
//! Operations on a [`Chart`] update the canonical state once and are then
//! carried out by a [`RenderTarget`]: either an engine living in-process, or
//! a remote context reachable only through injected command scripts.

pub mod chart;
pub mod codec;
pub mod command;
pub mod dimensions;
pub mod message;
pub mod queue;
pub mod replica;
pub mod target;
pub mod template;

// Re-exports
pub use chart::Chart;
pub use codec::{
    decode_options, encode_options, resolve_options, Callable, FunctionRegistry, NativeFn,
    ResolvedOptions,
};
pub use command::{Command, CommandKind, ScriptCodec};
pub use dimensions::{compute_dimensions, ContainerStyle, DimensionCoordinator, Dimensions, Size};
pub use message::{parse_inbound, InboundMessage, MessageHandler};
pub use queue::ReadinessQueue;
pub use replica::{RemoteReplica, ReplicaChart};
pub use target::{
    ChannelInjector, ContextKind, CreateSpec, ElementMount, EngineFactory, FnInjector,
    InProcessTarget, Mountable, PlotEngine, RemoteMount, RemoteTarget, RenderTarget,
    ScriptInjector,
};

pub use cb_core::{BridgeConfig, BridgeError, BridgeResult, LifecycleState, MountId};
pub use cb_data::Dataset;
