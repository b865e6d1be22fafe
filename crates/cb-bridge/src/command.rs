//! One-shot commands for the remote context and their script rendering

use serde_json::Value;

use cb_core::{BootstrapConfig, BridgeResult};
use cb_data::Dataset;

use crate::codec::js_literal;
use crate::queue::guarded;

/// Structured form of a command.
///
/// The script text is derived from it; the structure is kept so the same
/// command can be interpreted without a script engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Construct the engine instance, then flush the readiness queue
    Create {
        options_json: String,
        data: Dataset,
        background: String,
        sources: Vec<String>,
    },
    /// Replace the working buffer and redraw
    SetData(Dataset),
    /// Append one point to the working buffer and redraw
    PushPoint(Vec<f64>),
    /// Replace the working buffer with a sliced window and redraw
    ReplaceWindow(Dataset),
    SetScale { axis: String, scale: Value },
    SetSize { width: f64, height: f64 },
    /// Define a global visible to remote code
    SetVariable { name: String, value: Value },
    /// Release the engine instance and clear the readiness queue
    Destroy,
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Create { .. } => "create",
            CommandKind::SetData(_) => "set_data",
            CommandKind::PushPoint(_) => "push_point",
            CommandKind::ReplaceWindow(_) => "replace_window",
            CommandKind::SetScale { .. } => "set_scale",
            CommandKind::SetSize { .. } => "set_size",
            CommandKind::SetVariable { .. } => "set_variable",
            CommandKind::Destroy => "destroy",
        }
    }

    /// Whether re-running the command after a rebuild yields the same state
    pub fn is_replayable(&self) -> bool {
        matches!(
            self,
            CommandKind::SetVariable { .. } | CommandKind::SetData(_) | CommandKind::SetScale { .. }
        )
    }

    /// Whether the command goes through the readiness queue when no
    /// instance exists yet.
    ///
    /// Buffer updates apply immediately instead: the create command seeds
    /// the buffer from the canonical store, which already contains them.
    pub fn is_guarded(&self) -> bool {
        matches!(self, CommandKind::SetScale { .. } | CommandKind::SetSize { .. })
    }
}

/// An immutable instruction for the remote context
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: CommandKind,
    script: String,
}

impl Command {
    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Script text to inject
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn into_kind(self) -> CommandKind {
        self.kind
    }
}

/// Renders commands into scripts against the bootstrap contract
#[derive(Debug, Clone, Default)]
pub struct ScriptCodec {
    bootstrap: BootstrapConfig,
}

const NAMESPACE: &str = "var cb = window.__cb = window.__cb || { queue: [] };";

impl ScriptCodec {
    pub fn new(bootstrap: BootstrapConfig) -> Self {
        Self { bootstrap }
    }

    pub fn bootstrap(&self) -> &BootstrapConfig {
        &self.bootstrap
    }

    pub fn build(&self, kind: CommandKind) -> BridgeResult<Command> {
        let body = self.body(&kind)?;
        let script = if kind.is_guarded() {
            guarded(&body)
        } else {
            format!("(function() {{\n{}\n{}\n}})();\ntrue;", NAMESPACE, body)
        };
        Ok(Command { kind, script })
    }

    fn body(&self, kind: &CommandKind) -> BridgeResult<String> {
        let body = match kind {
            CommandKind::Create {
                options_json,
                data,
                background,
                sources,
            } => {
                let mut registrations = String::new();
                for source in sources {
                    registrations.push_str(&format!("(0, eval)({});\n", js_literal(source)?));
                }
                format!(
                    "if (cb.chart) return;\n\
                     var epoch = cb.epoch = (cb.epoch || 0) + 1;\n\
                     {registrations}\
                     document.body.style.backgroundColor = {background};\n\
                     cb.data = {data};\n\
                     cb.whenEngineReady(function() {{\n\
                       if (cb.chart || cb.epoch !== epoch) return;\n\
                       cb.opts = cb.parseOptions({options});\n\
                       cb.chart = new window[{engine}](cb.opts, cb.data, document.getElementById({mount}));\n\
                       cb.flush();\n\
                     }});",
                    registrations = registrations,
                    background = js_literal(background)?,
                    data = js_literal(data)?,
                    options = js_literal(options_json)?,
                    engine = js_literal(&self.bootstrap.engine_global)?,
                    mount = js_literal(&self.bootstrap.mount_element_id)?,
                )
            }
            CommandKind::SetData(data) | CommandKind::ReplaceWindow(data) => format!(
                "cb.data = {};\n{}",
                js_literal(data)?,
                redraw()
            ),
            CommandKind::PushPoint(point) => format!(
                "var point = {};\n\
                 if (!cb.data || cb.data.length !== point.length) {{\n\
                   cb.data = point.map(function() {{ return []; }});\n\
                 }}\n\
                 for (var i = 0; i < point.length; i++) {{ cb.data[i].push(point[i]); }}\n{}",
                js_literal(point)?,
                redraw()
            ),
            CommandKind::SetScale { axis, scale } => format!(
                "window.__cb.chart.setScale({}, {});",
                js_literal(axis)?,
                js_literal(scale)?
            ),
            CommandKind::SetSize { width, height } => format!(
                "window.__cb.chart.setSize({{ width: {}, height: {} }});",
                js_literal(width)?,
                js_literal(height)?
            ),
            CommandKind::SetVariable { name, value } => {
                format!("window[{}] = {};", js_literal(name)?, js_literal(value)?)
            }
            CommandKind::Destroy => "cb.queue = [];\n\
                 cb.epoch = (cb.epoch || 0) + 1;\n\
                 if (cb.chart) { cb.chart.destroy(); cb.chart = null; }\n\
                 else { console.debug('Chart not initialized'); }"
                .to_string(),
        };
        Ok(body)
    }
}

fn redraw() -> &'static str {
    "if (cb.chart) { cb.chart.setData(cb.data); } else { console.debug('Chart not initialized'); }"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> ScriptCodec {
        ScriptCodec::default()
    }

    #[test]
    fn test_guarded_commands_use_queue_wrapper() {
        let command = codec()
            .build(CommandKind::SetScale {
                axis: "x".into(),
                scale: json!({ "min": 0, "max": 10 }),
            })
            .unwrap();
        assert!(command.script().contains("queue.push"));
        assert!(command.script().contains("setScale(\"x\", {\"max\":10,\"min\":0})"));
    }

    #[test]
    fn test_push_sends_only_the_point() {
        let command = codec().build(CommandKind::PushPoint(vec![3.0, 4.5])).unwrap();
        assert!(command.script().contains("var point = [3.0,4.5];"));
        assert!(!command.script().contains("queue.push"));
    }

    #[test]
    fn test_create_embeds_options_as_string_literal() {
        let data = Dataset::from_series(vec![vec![1.0], vec![2.0]]).unwrap();
        let command = codec()
            .build(CommandKind::Create {
                options_json: r#"{"title":"it's"}"#.into(),
                data,
                background: "transparent".into(),
                sources: vec!["function fmt(v) { return v; }".into()],
            })
            .unwrap();
        let script = command.script();
        assert!(script.contains(r#"cb.parseOptions("{\"title\":\"it's\"}")"#));
        assert!(script.contains("cb.data = [[1.0],[2.0]];"));
        assert!(script.contains("(0, eval)(\"function fmt(v) { return v; }\");"));
        assert!(script.contains("new window[\"uPlot\"]"));
        assert!(script.contains("document.getElementById(\"chart\")"));
        assert!(script.contains("cb.flush();"));
    }

    #[test]
    fn test_destroy_clears_queue() {
        let command = codec().build(CommandKind::Destroy).unwrap();
        assert!(command.script().contains("cb.queue = [];"));
    }

    #[test]
    fn test_replayable_classification() {
        assert!(CommandKind::SetVariable { name: "a".into(), value: json!(1) }.is_replayable());
        assert!(!CommandKind::PushPoint(vec![1.0]).is_replayable());
        assert!(!CommandKind::Destroy.is_replayable());
    }
}
