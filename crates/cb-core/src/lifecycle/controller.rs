//! Lifecycle controller implementation

use super::{Effect, LifecycleEvent, LifecycleState, MountId};

/// Everything the state machine knows, as a plain value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub state: LifecycleState,

    /// Currently attached mount, if any
    pub mount: Option<MountId>,

    /// Last non-null mount ever attached
    pub last_mount: Option<MountId>,

    /// An engine instance exists for the current episode
    pub created: bool,

    /// Configuration has been supplied since the last destroy
    pub configured: bool,

    /// The current mount signaled it can host an engine
    pub loaded: bool,
}

impl Default for LifecycleSnapshot {
    fn default() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            mount: None,
            last_mount: None,
            created: false,
            configured: false,
            loaded: false,
        }
    }
}

/// Pure transition function: (current, event) -> (next, effects).
pub fn transition(
    current: &LifecycleSnapshot,
    event: LifecycleEvent,
) -> (LifecycleSnapshot, Vec<Effect>) {
    let mut next = *current;
    let mut effects = Vec::new();

    match event {
        LifecycleEvent::MountAttached(id) => {
            if current.mount == Some(id) {
                return (next, effects);
            }
            next.mount = Some(id);
            next.last_mount = Some(id);
            // Same id means same context: a page that already loaded stays loaded
            let same_context = current.last_mount == Some(id);

            match current.state {
                LifecycleState::Ready | LifecycleState::Reinitializing => {
                    let replaced = current.last_mount.is_some_and(|previous| previous != id);
                    if replaced && current.created {
                        next.state = LifecycleState::Reinitializing;
                        next.loaded = false;
                        effects.push(Effect::TeardownInstance);
                        effects.push(Effect::RegisterMount(id));
                        effects.push(Effect::ReplayVariables);
                        effects.push(Effect::CreateInstance);
                    } else {
                        // Same context coming back after a detach
                        effects.push(Effect::RegisterMount(id));
                    }
                }
                LifecycleState::Uninitialized | LifecycleState::Mounting => {
                    next.state = LifecycleState::Mounting;
                    next.loaded = same_context && current.loaded;
                    next.created = false;
                    effects.push(Effect::RegisterMount(id));
                    if next.configured && next.loaded {
                        next.created = true;
                        next.state = LifecycleState::Ready;
                        effects.push(Effect::CreateInstance);
                    }
                }
                LifecycleState::Destroying | LifecycleState::Destroyed => {
                    next.loaded = same_context && current.loaded;
                    effects.push(Effect::RegisterMount(id));
                }
            }
        }

        LifecycleEvent::MountDetached => {
            if current.mount.is_some() {
                next.mount = None;
                effects.push(Effect::ReleaseMount);
            }
        }

        LifecycleEvent::TargetReady | LifecycleEvent::RemoteLoaded => {
            if current.mount.is_none() {
                return (next, effects);
            }
            next.loaded = true;
            if current.state == LifecycleState::Mounting && current.configured && !current.created {
                next.created = true;
                next.state = LifecycleState::Ready;
                effects.push(Effect::CreateInstance);
            }
        }

        LifecycleEvent::Configured => {
            next.configured = true;
            match current.state {
                LifecycleState::Destroyed | LifecycleState::Uninitialized => {
                    next.created = false;
                    next.state = if current.mount.is_some() {
                        LifecycleState::Mounting
                    } else {
                        LifecycleState::Uninitialized
                    };
                    if current.mount.is_some() && current.loaded {
                        next.created = true;
                        next.state = LifecycleState::Ready;
                        effects.push(Effect::CreateInstance);
                    }
                }
                LifecycleState::Mounting => {
                    if current.loaded && !current.created {
                        next.created = true;
                        next.state = LifecycleState::Ready;
                        effects.push(Effect::CreateInstance);
                    }
                }
                LifecycleState::Ready
                | LifecycleState::Reinitializing
                | LifecycleState::Destroying => {}
            }
        }

        LifecycleEvent::RecreateComplete => {
            if current.state == LifecycleState::Reinitializing {
                next.state = LifecycleState::Ready;
            }
        }

        LifecycleEvent::Destroy { keep_data } => {
            next.state = LifecycleState::Destroying;
            next.created = false;
            next.configured = false;
            // A detached instance still exists and must be released
            if current.created || current.mount.is_some() {
                effects.push(Effect::TeardownInstance);
            }
            if !keep_data {
                effects.push(Effect::ClearData);
            }
        }

        LifecycleEvent::TeardownComplete => {
            if current.state == LifecycleState::Destroying {
                next.state = LifecycleState::Destroyed;
            }
        }
    }

    (next, effects)
}

/// Owns the lifecycle snapshot of one chart
#[derive(Debug, Default)]
pub struct LifecycleController {
    snapshot: LifecycleSnapshot,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an event and return the effects to perform
    pub fn apply(&mut self, event: LifecycleEvent) -> Vec<Effect> {
        let (next, effects) = transition(&self.snapshot, event);
        if next.state != self.snapshot.state {
            tracing::info!(
                "Lifecycle {} -> {} on {:?}",
                self.snapshot.state.name(),
                next.state.name(),
                event
            );
        } else {
            tracing::debug!("Lifecycle stays {} on {:?}", next.state.name(), event);
        }
        self.snapshot = next;
        effects
    }

    pub fn state(&self) -> LifecycleState {
        self.snapshot.state
    }

    pub fn mount(&self) -> Option<MountId> {
        self.snapshot.mount
    }

    pub fn last_mount(&self) -> Option<MountId> {
        self.snapshot.last_mount
    }

    pub fn is_created(&self) -> bool {
        self.snapshot.created
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[LifecycleEvent]) -> (LifecycleController, Vec<Effect>) {
        let mut controller = LifecycleController::new();
        let mut all = Vec::new();
        for event in events {
            all.extend(controller.apply(*event));
        }
        (controller, all)
    }

    #[test]
    fn test_attach_moves_to_mounting() {
        let (controller, effects) = run(&[LifecycleEvent::MountAttached(MountId(1))]);
        assert_eq!(controller.state(), LifecycleState::Mounting);
        assert_eq!(effects, vec![Effect::RegisterMount(MountId(1))]);
    }

    #[test]
    fn test_remote_load_creates_once_configured() {
        let (controller, effects) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
        ]);
        assert_eq!(controller.state(), LifecycleState::Ready);
        assert_eq!(
            effects,
            vec![Effect::RegisterMount(MountId(1)), Effect::CreateInstance]
        );
    }

    #[test]
    fn test_load_before_configuration_waits() {
        let (controller, effects) = run(&[
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
        ]);
        assert_eq!(controller.state(), LifecycleState::Mounting);
        assert!(!effects.contains(&Effect::CreateInstance));

        let mut controller = controller;
        assert_eq!(controller.apply(LifecycleEvent::Configured), vec![Effect::CreateInstance]);
        assert_eq!(controller.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_racing_readiness_signals_create_once() {
        let (controller, effects) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::TargetReady,
            LifecycleEvent::RemoteLoaded,
            LifecycleEvent::TargetReady,
        ]);
        let creates = effects.iter().filter(|e| **e == Effect::CreateInstance).count();
        assert_eq!(creates, 1);
        assert!(controller.is_created());
    }

    #[test]
    fn test_detach_is_not_teardown() {
        let (controller, effects) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
            LifecycleEvent::MountDetached,
        ]);
        assert_eq!(controller.state(), LifecycleState::Ready);
        assert!(!effects.contains(&Effect::TeardownInstance));
        assert_eq!(controller.mount(), None);
        assert_eq!(controller.last_mount(), Some(MountId(1)));
    }

    #[test]
    fn test_same_mount_reattach_does_not_reinitialize() {
        let (mut controller, _) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
            LifecycleEvent::MountDetached,
        ]);
        let effects = controller.apply(LifecycleEvent::MountAttached(MountId(1)));
        assert_eq!(effects, vec![Effect::RegisterMount(MountId(1))]);
        assert_eq!(controller.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_replaced_mount_reinitializes() {
        let (mut controller, _) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
            LifecycleEvent::MountDetached,
        ]);
        let effects = controller.apply(LifecycleEvent::MountAttached(MountId(2)));
        assert_eq!(
            effects,
            vec![
                Effect::TeardownInstance,
                Effect::RegisterMount(MountId(2)),
                Effect::ReplayVariables,
                Effect::CreateInstance,
            ]
        );
        assert_eq!(controller.state(), LifecycleState::Reinitializing);

        controller.apply(LifecycleEvent::RecreateComplete);
        assert_eq!(controller.state(), LifecycleState::Ready);
        assert!(controller.is_created());
    }

    #[test]
    fn test_replacement_without_detach_reinitializes() {
        let (mut controller, _) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::TargetReady,
        ]);
        let effects = controller.apply(LifecycleEvent::MountAttached(MountId(7)));
        assert!(effects.contains(&Effect::TeardownInstance));
        assert_eq!(controller.state(), LifecycleState::Reinitializing);
    }

    #[test]
    fn test_mount_change_while_mounting_just_registers() {
        let (controller, effects) = run(&[
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::MountAttached(MountId(2)),
        ]);
        assert_eq!(controller.state(), LifecycleState::Mounting);
        assert!(!effects.contains(&Effect::TeardownInstance));
    }

    #[test]
    fn test_destroy_keep_data() {
        let (mut controller, _) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
        ]);
        let effects = controller.apply(LifecycleEvent::Destroy { keep_data: true });
        assert_eq!(effects, vec![Effect::TeardownInstance]);
        assert_eq!(controller.state(), LifecycleState::Destroying);
        controller.apply(LifecycleEvent::TeardownComplete);
        assert_eq!(controller.state(), LifecycleState::Destroyed);

        // Restart: the context is still loaded, so creation is immediate
        assert_eq!(controller.apply(LifecycleEvent::Configured), vec![Effect::CreateInstance]);
        assert_eq!(controller.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_destroy_while_detached_tears_down() {
        let (mut controller, _) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::TargetReady,
            LifecycleEvent::MountDetached,
        ]);
        let effects = controller.apply(LifecycleEvent::Destroy { keep_data: true });
        assert_eq!(effects, vec![Effect::TeardownInstance]);
        controller.apply(LifecycleEvent::TeardownComplete);

        assert!(controller.apply(LifecycleEvent::Configured).is_empty());
        assert_eq!(controller.state(), LifecycleState::Uninitialized);

        // The loaded context comes back: recreate right away
        let effects = controller.apply(LifecycleEvent::MountAttached(MountId(1)));
        assert_eq!(
            effects,
            vec![Effect::RegisterMount(MountId(1)), Effect::CreateInstance]
        );
        assert_eq!(controller.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_new_context_waits_for_its_own_load() {
        let (mut controller, _) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::MountAttached(MountId(1)),
            LifecycleEvent::RemoteLoaded,
            LifecycleEvent::MountDetached,
            LifecycleEvent::Destroy { keep_data: true },
            LifecycleEvent::TeardownComplete,
            LifecycleEvent::Configured,
        ]);
        let effects = controller.apply(LifecycleEvent::MountAttached(MountId(2)));
        assert_eq!(effects, vec![Effect::RegisterMount(MountId(2))]);
        assert_eq!(controller.state(), LifecycleState::Mounting);
    }

    #[test]
    fn test_destroy_drop_data() {
        let (_, effects) = run(&[
            LifecycleEvent::Configured,
            LifecycleEvent::Destroy { keep_data: false },
        ]);
        assert_eq!(effects, vec![Effect::ClearData]);
    }

    #[test]
    fn test_destroyed_without_mount_restarts_uninitialized() {
        let (controller, effects) = run(&[
            LifecycleEvent::Destroy { keep_data: true },
            LifecycleEvent::TeardownComplete,
            LifecycleEvent::Configured,
        ]);
        assert_eq!(controller.state(), LifecycleState::Uninitialized);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_transition_is_pure() {
        let start = LifecycleSnapshot::default();
        let (a, ea) = transition(&start, LifecycleEvent::MountAttached(MountId(3)));
        let (b, eb) = transition(&start, LifecycleEvent::MountAttached(MountId(3)));
        assert_eq!(a, b);
        assert_eq!(ea, eb);
        assert_eq!(start, LifecycleSnapshot::default());
    }
}
