//! Chart lifecycle: states, events and the side effects a transition asks for

use serde::{Deserialize, Serialize};
use std::fmt;

mod controller;

pub use controller::{transition, LifecycleController, LifecycleSnapshot};

/// Identity of a mount target (a DOM element or an embedded web view).
///
/// Two attachments with the same id are the same underlying context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MountId(pub u64);

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mount#{}", self.0)
    }
}

/// Lifecycle states of a chart instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No instance, no mount
    Uninitialized,
    /// Mount assigned, rendering context not yet ready
    Mounting,
    /// Engine instance exists, commands run immediately
    Ready,
    /// Mount replaced; stale instance torn down and being rebuilt
    Reinitializing,
    /// Teardown in flight
    Destroying,
    /// Engine instance released
    Destroyed,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Mounting => "mounting",
            LifecycleState::Ready => "ready",
            LifecycleState::Reinitializing => "reinitializing",
            LifecycleState::Destroying => "destroying",
            LifecycleState::Destroyed => "destroyed",
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A non-null mount reference was assigned
    MountAttached(MountId),
    /// The mount reference went null
    MountDetached,
    /// The in-process target can host an engine
    TargetReady,
    /// The remote context finished loading its page
    RemoteLoaded,
    /// The caller supplied configuration (and possibly data)
    Configured,
    /// Teardown + recreate after a mount replacement finished
    RecreateComplete,
    /// Explicit destroy
    Destroy { keep_data: bool },
    /// Teardown after an explicit destroy finished
    TeardownComplete,
}

/// Side effects the owner of the controller must carry out, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Hand the new mount to the render target
    RegisterMount(MountId),
    /// Take the mount away from the render target
    ReleaseMount,
    /// Construct the engine instance from the canonical store
    CreateInstance,
    /// Destroy the engine instance and clear pending commands
    TeardownInstance,
    /// Drop the canonical dataset
    ClearData,
    /// Re-apply every auxiliary variable
    ReplayVariables,
}
