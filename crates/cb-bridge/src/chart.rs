//! The per-chart control surface
//!
//! A [`Chart`] owns the canonical dataset, the configuration and the
//! auxiliary variables. Every operation updates that state once and then
//! hands the result to its [`RenderTarget`]; the lifecycle controller decides
//! when instances are created, torn down and rebuilt.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use cb_core::events::events::{
    ChartCreated, ChartDestroyed, ChartReinitialized, RemoteMessage,
};
use cb_core::{
    BridgeConfig, BridgeResult, ChartId, Effect, EventBus, LifecycleController, LifecycleEvent,
    LifecycleState,
};
use cb_data::{Dataset, PushOutcome};

use crate::dimensions::{ContainerStyle, DimensionCoordinator, Size};
use crate::message::{parse_inbound, InboundMessage, MessageHandler};
use crate::target::{ContextKind, CreateSpec, Mountable, RemoteTarget, RenderTarget};
use crate::template;

/// One logical chart bound to a render target
pub struct Chart<T: RenderTarget> {
    id: ChartId,
    name: String,
    config: BridgeConfig,
    options: Value,
    background: Option<String>,
    data: Dataset,
    variables: IndexMap<String, Value>,
    sources: Vec<String>,
    lifecycle: LifecycleController,
    dimensions: DimensionCoordinator,
    target: T,
    pending_mount: Option<T::Mount>,
    events: EventBus,
    message_handler: Option<MessageHandler>,
}

impl Chart<RemoteTarget> {
    /// Chart driving a remote context bootstrapped per `config`
    pub fn remote(name: impl Into<String>, config: BridgeConfig) -> BridgeResult<Self> {
        let target = RemoteTarget::new(config.bootstrap.clone());
        Self::new(name, target, config)
    }

    /// Script the host injects into the remote context before any command
    pub fn injected_script(&self) -> BridgeResult<String> {
        template::injected_script(&self.config.bootstrap, self.config.injected_script.as_deref())
    }
}

impl<T: RenderTarget> Chart<T> {
    pub fn new(name: impl Into<String>, target: T, config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self {
            id: ChartId::new_v4(),
            name: name.into(),
            dimensions: DimensionCoordinator::new(config.margins),
            config,
            options: Value::Object(Default::default()),
            background: None,
            data: Dataset::new(),
            variables: IndexMap::new(),
            sources: Vec::new(),
            lifecycle: LifecycleController::new(),
            target,
            pending_mount: None,
            events: EventBus::new(),
            message_handler: None,
        })
    }

    /// Container styling used for sizing and the default background
    pub fn with_style(mut self, style: ContainerStyle) -> Self {
        self.dimensions.set_style(style);
        self
    }

    pub fn set_style(&mut self, style: ContainerStyle) {
        self.dimensions.set_style(style);
    }

    /// Route non-console inbound messages to `handler`
    pub fn on_message(&mut self, handler: impl FnMut(&InboundMessage) + 'static) {
        self.message_handler = Some(Box::new(handler));
    }

    /// Raw source declaring named functions in the remote context.
    ///
    /// Sent with every create, ahead of the options that reference them.
    pub fn register_function_source(&mut self, source: impl Into<String>) {
        self.sources.push(source.into());
    }

    pub fn id(&self) -> ChartId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// The canonical dataset
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.variables
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Supply configuration and, optionally, data and a background color.
    ///
    /// Without `data` the retained canonical dataset is used. Creation
    /// happens as soon as the mount can host an instance.
    pub fn create_chart(
        &mut self,
        options: Value,
        data: Option<Dataset>,
        background: Option<&str>,
    ) -> BridgeResult<()> {
        if self.lifecycle.is_created() {
            debug!("Chart '{}' already created; ignoring create", self.name);
            return Ok(());
        }
        self.options = options;
        if let Some(data) = data {
            self.data.replace(data);
        }
        if let Some(background) = background {
            self.background = Some(background.to_string());
        }
        let effects = self.lifecycle.apply(LifecycleEvent::Configured);
        self.run_effects(effects)
    }

    /// Full reconfiguration: destroy keeping data, then create again
    pub fn update_options(&mut self, options: Value) -> BridgeResult<()> {
        if !self.lifecycle.is_created() {
            self.options = options;
            return Ok(());
        }
        self.destroy(true)?;
        self.create_chart(options, None, None)
    }

    /// Replace the canonical dataset in full
    pub fn set_data(&mut self, data: Dataset) -> BridgeResult<()> {
        self.data.replace(data);
        self.target.set_data(&self.data)
    }

    /// Append one value per series
    pub fn push_data(&mut self, point: &[f64]) -> BridgeResult<()> {
        match self.data.push(point) {
            PushOutcome::Ignored => return Ok(()),
            PushOutcome::Reset { previous_arity } => {
                debug!(
                    "Point arity {} differs from {} series; store reset",
                    point.len(),
                    previous_arity
                );
            }
            PushOutcome::Appended => {}
        }
        self.target.push_point(point, &self.data)
    }

    /// Restrict every series to the window where `axis` lies in `[min, max]`
    pub fn slice_series(&mut self, axis: usize, min: f64, max: f64) -> BridgeResult<()> {
        if self.data.slice(axis, min, max)?.is_none() {
            debug!("No values of series {} within [{}, {}]", axis, min, max);
        }
        self.target.replace_window(&self.data)
    }

    pub fn set_scale(&mut self, axis: &str, scale: Value) -> BridgeResult<()> {
        self.target.set_scale(axis, &scale)
    }

    /// Set a named variable in the rendering context; replayed on
    /// reinitialization
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) -> BridgeResult<()> {
        let name = name.into();
        self.target.set_variable(&name, &value)?;
        self.variables.insert(name, value);
        Ok(())
    }

    pub fn set_size(&mut self, width: f64, height: f64) -> BridgeResult<()> {
        self.target.set_size(width, height)
    }

    /// Release the engine instance; the dataset survives when `keep_data`
    pub fn destroy(&mut self, keep_data: bool) -> BridgeResult<()> {
        let effects = self.lifecycle.apply(LifecycleEvent::Destroy { keep_data });
        self.run_effects(effects)?;
        self.lifecycle.apply(LifecycleEvent::TeardownComplete);
        info!("Chart '{}' destroyed (keep data: {})", self.name, keep_data);
        self.events.publish(ChartDestroyed {
            chart_id: self.id,
            kept_data: keep_data,
        });
        Ok(())
    }

    /// Destroy, dropping data, then create from scratch
    pub fn reset(
        &mut self,
        options: Value,
        data: Dataset,
        background: Option<&str>,
    ) -> BridgeResult<()> {
        self.destroy(false)?;
        self.create_chart(options, Some(data), background)
    }

    /// Host assigned a mount (`Some`) or cleared it (`None`)
    pub fn attach_mount(&mut self, mount: Option<T::Mount>) -> BridgeResult<()> {
        let Some(mount) = mount else {
            let effects = self.lifecycle.apply(LifecycleEvent::MountDetached);
            return self.run_effects(effects);
        };

        let id = mount.mount_id();
        let previous = self.lifecycle.last_mount();
        self.pending_mount = Some(mount);
        let effects = self.lifecycle.apply(LifecycleEvent::MountAttached(id));
        self.run_effects(effects)?;

        // Same context handed over again: refresh the handle only
        if let Some(mount) = self.pending_mount.take() {
            self.target.attach(mount);
        }

        if self.lifecycle.state() == LifecycleState::Reinitializing {
            self.lifecycle.apply(LifecycleEvent::RecreateComplete);
            if let Some(previous) = previous {
                info!("Chart '{}' reinitialized on {}", self.name, id);
                self.events.publish(ChartReinitialized {
                    chart_id: self.id,
                    previous,
                    current: id,
                });
            }
        }

        if self.target.ready_on_attach() {
            let effects = self.lifecycle.apply(LifecycleEvent::TargetReady);
            self.run_effects(effects)?;
        }
        Ok(())
    }

    /// The remote page finished loading
    pub fn on_load_end(&mut self) -> BridgeResult<()> {
        let effects = self.lifecycle.apply(LifecycleEvent::RemoteLoaded);
        self.run_effects(effects)
    }

    /// Layout measurement of the hosting view
    pub fn on_layout(&mut self, width: f64, height: f64) -> BridgeResult<()> {
        if let Some(plot) = self.dimensions.on_layout(&self.options, Size::new(width, height)) {
            if self.lifecycle.is_created() {
                self.target.set_size(plot.width, plot.height)?;
            }
        }
        if self.target.context() == ContextKind::InProcess {
            let effects = self.lifecycle.apply(LifecycleEvent::TargetReady);
            self.run_effects(effects)?;
        }
        Ok(())
    }

    /// Raw payload from the inbound diagnostic channel
    pub fn handle_message(&mut self, raw: &str) {
        let Some(message) = parse_inbound(raw) else {
            return;
        };

        if message.is_console() {
            info!("[Console] {}", message.data);
            return;
        }
        if message.is_error() {
            error!("Remote context for '{}' reported: {}", self.name, message.data);
        }

        match self.message_handler.as_mut() {
            Some(handler) => handler(&message),
            None => self.events.publish(RemoteMessage {
                chart_id: self.id,
                kind: message.kind,
                data: message.data,
            }),
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) -> BridgeResult<()> {
        for effect in effects {
            match effect {
                Effect::RegisterMount(id) => match self.pending_mount.take() {
                    Some(mount) => self.target.attach(mount),
                    None => warn!("No handle available for {}", id),
                },
                Effect::ReleaseMount => {
                    self.target.detach();
                }
                Effect::TeardownInstance => {
                    self.target.destroy()?;
                    self.dimensions.reset();
                }
                Effect::ClearData => self.data.clear(),
                Effect::ReplayVariables => {
                    for (name, value) in &self.variables {
                        self.target.set_variable(name, value)?;
                    }
                }
                Effect::CreateInstance => self.create_instance()?,
            }
        }
        Ok(())
    }

    fn create_instance(&mut self) -> BridgeResult<()> {
        let dimensions = self.dimensions.dimensions(&self.options);
        let background = self
            .background
            .clone()
            .or_else(|| self.dimensions.style().background_color.clone())
            .unwrap_or_else(|| self.config.background_color.clone());

        let spec = CreateSpec {
            options: &dimensions.options,
            data: &self.data,
            background: &background,
            sources: &self.sources,
        };
        self.target.create(&spec)?;

        info!(
            "Chart '{}' created ({}x{}, {} series, {} points)",
            self.name,
            dimensions.plot.width,
            dimensions.plot.height,
            self.data.series_count(),
            self.data.len()
        );
        self.events.publish(ChartCreated {
            chart_id: self.id,
            mount: self.lifecycle.mount(),
        });
        Ok(())
    }
}
