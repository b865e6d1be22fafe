//! Type-keyed publish/subscribe for chart notifications
//!
//! Subscribers are looked up by the concrete event type. Delivery happens
//! outside the registry lock, so a handler may publish further events or
//! subscribe new handlers. A handler that is already running is skipped
//! rather than entered twice.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};

type SharedHandler = Arc<Mutex<Box<dyn EventHandler>>>;

/// Chart-wide event bus; clones share subscribers
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<AHashMap<TypeId, Vec<SharedHandler>>>>,
}

/// Anything that can travel over the bus
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Lifecycle and channel events published by a chart
pub mod events {
    use super::Event;
    use crate::lifecycle::MountId;
    use uuid::Uuid;

    /// An engine instance was constructed
    #[derive(Debug, Clone)]
    pub struct ChartCreated {
        pub chart_id: Uuid,
        pub mount: Option<MountId>,
    }

    /// The engine instance was released
    #[derive(Debug, Clone)]
    pub struct ChartDestroyed {
        pub chart_id: Uuid,
        pub kept_data: bool,
    }

    /// The mount was replaced and the instance rebuilt
    #[derive(Debug, Clone)]
    pub struct ChartReinitialized {
        pub chart_id: Uuid,
        pub previous: MountId,
        pub current: MountId,
    }

    /// Inbound message nobody else claimed
    #[derive(Debug, Clone)]
    pub struct RemoteMessage {
        pub chart_id: Uuid,
        /// `None` for payloads posted without a `type`
        pub kind: Option<String>,
        pub data: serde_json::Value,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        ChartCreated,
        ChartDestroyed,
        ChartReinitialized,
        RemoteMessage
    );
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        self.subscribers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Arc::new(Mutex::new(handler)));
    }

    /// Register a closure receiving `E` already downcast
    pub fn on<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers
            .read()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its type, in subscription order
    pub fn publish<E: Event>(&self, event: E) {
        // Snapshot, so handlers run without the registry lock held
        let targets = match self.subscribers.read().get(&TypeId::of::<E>()) {
            Some(list) => list.clone(),
            None => return,
        };
        for handler in &targets {
            match handler.try_lock() {
                Some(mut handler) => handler.handle(&event),
                None => tracing::warn!(
                    "Handler for {} is still running; skipping nested delivery",
                    type_name::<E>()
                ),
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        f.debug_struct("EventBus")
            .field("event_types", &subscribers.len())
            .field("handlers", &subscribers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Adapter turning a closure into an [`EventHandler`]
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
