//! Headless model of the remote context
//!
//! [`RemoteReplica`] executes the structured side of each [`Command`] with
//! the same semantics the injected scripts have in a real page: guarded
//! commands wait in a FIFO queue until an instance exists, buffer updates
//! apply immediately, create waits for the engine runtime, destroy clears
//! the queue. Diagnostics are posted to an outbox in the inbound message
//! format.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::codec::{decode_options, FunctionRegistry};
use crate::command::{Command, CommandKind};
use crate::queue::ReadinessQueue;
use crate::target::ScriptInjector;

/// The engine instance as the remote context sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaChart {
    /// Options after sentinel resolution
    pub options: Value,
    /// Data last handed to the engine
    pub data: Vec<Vec<f64>>,
    pub scales: IndexMap<String, Value>,
    pub size: Option<(f64, f64)>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone)]
struct ParkedCreate {
    epoch: u64,
    options_json: String,
}

/// In-memory stand-in for a remote page running the bootstrap preamble
#[derive(Debug)]
pub struct RemoteReplica {
    engine_loaded: bool,
    functions: FunctionRegistry,
    globals: IndexMap<String, Value>,
    background: Option<String>,
    buffer: Option<Vec<Vec<f64>>>,
    chart: Option<ReplicaChart>,
    queue: ReadinessQueue<CommandKind>,
    parked: Option<ParkedCreate>,
    epoch: u64,
    executed: Vec<&'static str>,
    creations: usize,
    outbox: Vec<String>,
}

impl Default for RemoteReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteReplica {
    /// A page whose engine runtime is already loaded
    pub fn new() -> Self {
        Self {
            engine_loaded: true,
            functions: FunctionRegistry::new(),
            globals: IndexMap::new(),
            background: None,
            buffer: None,
            chart: None,
            queue: ReadinessQueue::new(),
            parked: None,
            epoch: 0,
            executed: Vec::new(),
            creations: 0,
            outbox: Vec::new(),
        }
    }

    /// A page still loading its engine runtime
    pub fn loading() -> Self {
        Self {
            engine_loaded: false,
            ..Self::new()
        }
    }

    /// Wrap for sharing with a [`RemoteMount`](crate::target::RemoteMount)
    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    /// Declare a global function, as a host page script would
    pub fn define_function(&mut self, name: &str) {
        self.functions.register(name, |_: &[Value]| Value::Null);
    }

    /// Execute one command
    pub fn apply(&mut self, kind: CommandKind) {
        match kind {
            CommandKind::Create {
                options_json,
                data,
                background,
                sources,
            } => {
                if self.chart.is_some() {
                    return;
                }
                self.epoch += 1;
                for source in &sources {
                    for name in declared_functions(source) {
                        self.define_function(&name);
                    }
                }
                self.background = Some(background);
                self.buffer = Some(data.into_series());

                if self.engine_loaded {
                    self.construct(&options_json);
                } else {
                    self.parked = Some(ParkedCreate {
                        epoch: self.epoch,
                        options_json,
                    });
                }
            }
            CommandKind::SetData(data) | CommandKind::ReplaceWindow(data) => {
                self.buffer = Some(data.into_series());
                self.redraw("set_data");
            }
            CommandKind::PushPoint(point) => {
                let buffer = self.buffer.get_or_insert_with(Vec::new);
                if buffer.len() != point.len() {
                    *buffer = vec![Vec::new(); point.len()];
                }
                for (series, value) in buffer.iter_mut().zip(&point) {
                    series.push(*value);
                }
                self.redraw("push_point");
            }
            CommandKind::SetVariable { name, value } => {
                self.globals.insert(name, value);
            }
            CommandKind::Destroy => {
                self.queue.reset();
                self.epoch += 1;
                self.parked = None;
                if self.chart.take().is_some() {
                    self.executed.push("destroy");
                } else {
                    self.console("debug", "Chart not initialized");
                }
            }
            guarded @ (CommandKind::SetScale { .. } | CommandKind::SetSize { .. }) => {
                if let Some(kind) = self.queue.submit(guarded) {
                    self.run_guarded(kind);
                } else {
                    self.console("debug", "Chart not initialized; command queued");
                }
            }
        }
    }

    /// The engine runtime finished loading; run a parked create
    pub fn finish_engine_load(&mut self) {
        self.engine_loaded = true;
        if let Some(parked) = self.parked.take() {
            if parked.epoch == self.epoch {
                self.construct(&parked.options_json);
            }
        }
    }

    /// The engine wait timed out; a parked create is abandoned
    pub fn expire_bootstrap(&mut self) {
        if self.parked.take().is_some() {
            self.console("error", "Engine runtime not available");
            self.post("Error", json!("engine runtime unavailable"));
        }
    }

    fn construct(&mut self, options_json: &str) {
        let resolved = match decode_options(options_json, &self.functions) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.console("error", &format!("Invalid options: {}", e));
                return;
            }
        };
        for name in &resolved.unresolved {
            self.console("error", &format!("Unresolved callable: {}", name));
        }

        self.chart = Some(ReplicaChart {
            options: resolved.value,
            data: self.buffer.clone().unwrap_or_default(),
            scales: IndexMap::new(),
            size: None,
            unresolved: resolved.unresolved,
        });
        self.creations += 1;
        self.executed.push("create");

        for kind in self.queue.mark_ready() {
            self.run_guarded(kind);
        }
    }

    fn run_guarded(&mut self, kind: CommandKind) {
        let Some(chart) = self.chart.as_mut() else {
            return;
        };
        match kind {
            CommandKind::SetScale { axis, scale } => {
                chart.scales.insert(axis, scale);
                self.executed.push("set_scale");
            }
            CommandKind::SetSize { width, height } => {
                chart.size = Some((width, height));
                self.executed.push("set_size");
            }
            _ => {}
        }
    }

    fn redraw(&mut self, op: &'static str) {
        match self.chart.as_mut() {
            Some(chart) => {
                chart.data = self.buffer.clone().unwrap_or_default();
                self.executed.push(op);
            }
            None => self.console("debug", "Chart not initialized"),
        }
    }

    fn console(&mut self, level: &str, message: &str) {
        self.post("Console", json!({ "level": level, "args": [message] }));
    }

    fn post(&mut self, kind: &str, data: Value) {
        self.outbox.push(json!({ "type": kind, "data": data }).to_string());
    }

    pub fn chart(&self) -> Option<&ReplicaChart> {
        self.chart.as_ref()
    }

    /// Working buffer, which may run ahead of the rendered data
    pub fn buffer(&self) -> Option<&Vec<Vec<f64>>> {
        self.buffer.as_ref()
    }

    pub fn globals(&self) -> &IndexMap<String, Value> {
        &self.globals
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// Guarded commands waiting for an instance
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Operations that ran against an instance, in execution order
    pub fn executed(&self) -> &[&'static str] {
        &self.executed
    }

    /// How many instances were constructed
    pub fn creations(&self) -> usize {
        self.creations
    }

    pub fn is_create_pending(&self) -> bool {
        self.parked.is_some()
    }

    /// Messages posted since the last call, oldest first
    pub fn take_outbox(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }
}

impl ScriptInjector for Arc<Mutex<RemoteReplica>> {
    fn inject(&self, command: &Command) {
        self.lock().apply(command.kind().clone());
    }
}

/// Names of `function name(...)` declarations in raw source
fn declared_functions(source: &str) -> Vec<String> {
    const KEYWORD: &str = "function";
    let mut names = Vec::new();
    let mut rest = source;
    while let Some(position) = rest.find(KEYWORD) {
        let after = &rest[position + KEYWORD.len()..];
        let trimmed = after.trim_start();
        if trimmed.len() < after.len() {
            let name: String = trimmed
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            if !name.is_empty() && trimmed[name.len()..].trim_start().starts_with('(') {
                names.push(name);
            }
        }
        rest = after;
    }
    names
}
