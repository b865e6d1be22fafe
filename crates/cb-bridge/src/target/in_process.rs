//! In-process target: the engine lives in the same context as the caller

use indexmap::IndexMap;
use serde_json::Value;

use cb_core::{BridgeResult, MountId};
use cb_data::Dataset;

use super::{ContextKind, CreateSpec, Mountable, RenderTarget};
use crate::codec::{resolve_options, FunctionRegistry, ResolvedOptions};
use crate::queue::ReadinessQueue;

/// A live plotting engine instance
pub trait PlotEngine: Send {
    fn set_data(&mut self, data: &Dataset) -> anyhow::Result<()>;

    fn set_scale(&mut self, axis: &str, scale: &Value) -> anyhow::Result<()>;

    fn set_size(&mut self, width: f64, height: f64) -> anyhow::Result<()>;

    fn destroy(&mut self) -> anyhow::Result<()>;
}

/// Constructs engine instances inside a host element
pub trait EngineFactory {
    /// Host element an engine mounts into
    type Element;

    fn create(
        &self,
        options: &ResolvedOptions,
        data: &Dataset,
        element: &Self::Element,
    ) -> anyhow::Result<Box<dyn PlotEngine>>;
}

/// A host element together with its identity
#[derive(Debug, Clone)]
pub struct ElementMount<E> {
    pub id: MountId,
    pub element: E,
}

impl<E> ElementMount<E> {
    pub fn new(id: MountId, element: E) -> Self {
        Self { id, element }
    }
}

impl<E> Mountable for ElementMount<E> {
    fn mount_id(&self) -> MountId {
        self.id
    }
}

/// View operations issued before the engine exists
#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Scale { axis: String, scale: Value },
    Size { width: f64, height: f64 },
}

/// Drives an engine created directly by `F`
pub struct InProcessTarget<F: EngineFactory> {
    factory: F,
    registry: FunctionRegistry,
    mount: Option<ElementMount<F::Element>>,
    engine: Option<Box<dyn PlotEngine>>,
    deferred: ReadinessQueue<Deferred>,
    globals: IndexMap<String, Value>,
}

impl<F: EngineFactory> InProcessTarget<F> {
    pub fn new(factory: F) -> Self {
        Self::with_registry(factory, FunctionRegistry::new())
    }

    /// Callables in the options resolve against `registry`
    pub fn with_registry(factory: F, registry: FunctionRegistry) -> Self {
        Self {
            factory,
            registry,
            mount: None,
            engine: None,
            deferred: ReadinessQueue::new(),
            globals: IndexMap::new(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    /// Variables set through the bridge
    pub fn globals(&self) -> &IndexMap<String, Value> {
        &self.globals
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn run(&mut self, op: Deferred) -> BridgeResult<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        match op {
            Deferred::Scale { axis, scale } => engine.set_scale(&axis, &scale)?,
            Deferred::Size { width, height } => engine.set_size(width, height)?,
        }
        Ok(())
    }

    fn submit(&mut self, op: Deferred) -> BridgeResult<()> {
        match self.deferred.submit(op) {
            Some(op) => self.run(op),
            None => {
                tracing::debug!("Engine not created yet; deferring view operation");
                Ok(())
            }
        }
    }
}

impl<F: EngineFactory> RenderTarget for InProcessTarget<F> {
    type Mount = ElementMount<F::Element>;

    fn context(&self) -> ContextKind {
        ContextKind::InProcess
    }

    fn ready_on_attach(&self) -> bool {
        true
    }

    fn attach(&mut self, mount: Self::Mount) {
        tracing::debug!("Attaching in-process target to {}", mount.id);
        self.mount = Some(mount);
    }

    fn detach(&mut self) -> Option<Self::Mount> {
        self.mount.take()
    }

    fn is_attached(&self) -> bool {
        self.mount.is_some()
    }

    fn create(&mut self, spec: &CreateSpec<'_>) -> BridgeResult<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let Some(mount) = self.mount.as_ref() else {
            tracing::warn!("Cannot create engine: no element attached");
            return Ok(());
        };

        let resolved = resolve_options(spec.options, &self.registry);
        let engine = self.factory.create(&resolved, spec.data, &mount.element)?;
        self.engine = Some(engine);
        tracing::info!("Created in-process engine on {} ({} points)", mount.id, spec.data.len());

        for op in self.deferred.mark_ready() {
            self.run(op)?;
        }
        Ok(())
    }

    fn set_data(&mut self, data: &Dataset) -> BridgeResult<()> {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_data(data)?;
        }
        Ok(())
    }

    fn push_point(&mut self, _point: &[f64], data: &Dataset) -> BridgeResult<()> {
        self.set_data(data)
    }

    fn replace_window(&mut self, data: &Dataset) -> BridgeResult<()> {
        self.set_data(data)
    }

    fn set_scale(&mut self, axis: &str, scale: &Value) -> BridgeResult<()> {
        self.submit(Deferred::Scale {
            axis: axis.to_string(),
            scale: scale.clone(),
        })
    }

    fn set_size(&mut self, width: f64, height: f64) -> BridgeResult<()> {
        self.submit(Deferred::Size { width, height })
    }

    fn set_variable(&mut self, name: &str, value: &Value) -> BridgeResult<()> {
        self.globals.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn destroy(&mut self) -> BridgeResult<()> {
        self.deferred.reset();
        if let Some(mut engine) = self.engine.take() {
            engine.destroy()?;
            tracing::info!("Destroyed in-process engine");
        }
        Ok(())
    }
}
