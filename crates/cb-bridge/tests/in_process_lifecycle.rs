use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use cb_bridge::codec::ResolvedOptions;
use cb_bridge::{
    BridgeConfig, BridgeError, Callable, Chart, ContainerStyle, Dataset, ElementMount,
    EngineFactory, InProcessTarget, LifecycleState, MountId, PlotEngine,
};

#[derive(Debug, Clone, Default)]
struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct FakeEngine {
    log: CallLog,
}

impl PlotEngine for FakeEngine {
    fn set_data(&mut self, data: &Dataset) -> anyhow::Result<()> {
        self.log.record(format!("set_data:{}", data.len()));
        Ok(())
    }

    fn set_scale(&mut self, axis: &str, _scale: &Value) -> anyhow::Result<()> {
        self.log.record(format!("set_scale:{}", axis));
        Ok(())
    }

    fn set_size(&mut self, width: f64, height: f64) -> anyhow::Result<()> {
        self.log.record(format!("set_size:{}x{}", width, height));
        Ok(())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        self.log.record("destroy");
        Ok(())
    }
}

#[derive(Default)]
struct FakeFactory {
    log: CallLog,
    fail: bool,
    last_options: Mutex<Option<ResolvedOptions>>,
}

impl EngineFactory for FakeFactory {
    type Element = &'static str;

    fn create(
        &self,
        options: &ResolvedOptions,
        data: &Dataset,
        element: &&'static str,
    ) -> anyhow::Result<Box<dyn PlotEngine>> {
        if self.fail {
            anyhow::bail!("engine rejected options");
        }
        self.log.record(format!("create:{}:{}", element, data.len()));
        *self.last_options.lock() = Some(options.clone());
        Ok(Box::new(FakeEngine { log: self.log.clone() }))
    }
}

fn chart_with(factory: FakeFactory) -> (Chart<InProcessTarget<FakeFactory>>, CallLog) {
    let log = factory.log.clone();
    let target = InProcessTarget::new(factory);
    let chart = Chart::new("inline", target, BridgeConfig::default()).unwrap();
    (chart, log)
}

fn element(id: u64, name: &'static str) -> Option<ElementMount<&'static str>> {
    Some(ElementMount::new(MountId(id), name))
}

fn sample() -> Dataset {
    Dataset::from_series(vec![vec![1.0, 2.0, 3.0], vec![5.0, 6.0, 7.0]]).unwrap()
}

#[test]
fn test_attach_creates_when_configured() {
    let (mut chart, log) = chart_with(FakeFactory::default());

    chart.create_chart(json!({}), Some(sample()), None).unwrap();
    assert_eq!(chart.state(), LifecycleState::Uninitialized);

    chart.attach_mount(element(1, "plot-root")).unwrap();
    assert_eq!(chart.state(), LifecycleState::Ready);
    assert!(chart.target().has_engine());
    assert_eq!(log.calls(), vec!["create:plot-root:3"]);
}

#[test]
fn test_view_operations_wait_for_engine() {
    let (mut chart, log) = chart_with(FakeFactory::default());
    chart.attach_mount(element(1, "plot-root")).unwrap();
    assert_eq!(chart.state(), LifecycleState::Mounting);

    chart.set_size(640.0, 480.0).unwrap();
    chart.set_scale("x", json!({ "min": 0 })).unwrap();
    assert!(log.calls().is_empty());

    chart.create_chart(json!({}), Some(sample()), None).unwrap();
    assert_eq!(
        log.calls(),
        vec!["create:plot-root:3", "set_size:640x480", "set_scale:x"]
    );
}

#[test]
fn test_layout_and_attach_create_only_once() {
    let (mut chart, log) = chart_with(FakeFactory::default());
    chart.create_chart(json!({}), Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "plot-root")).unwrap();
    chart.on_layout(800.0, 600.0).unwrap();
    chart.on_layout(800.0, 600.0).unwrap();

    let creates = log.calls().iter().filter(|c| c.starts_with("create")).count();
    assert_eq!(creates, 1);
}

#[test]
fn test_style_bounds_the_container() {
    let factory = FakeFactory::default();
    let target = InProcessTarget::new(factory);
    let style = ContainerStyle {
        width: Some(300.0),
        height: Some(200.0),
        background_color: Some("#000".to_string()),
    };
    let mut chart = Chart::new("styled", target, BridgeConfig::default())
        .unwrap()
        .with_style(style);

    chart.create_chart(json!({ "title": "t" }), Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "plot-root")).unwrap();

    let options = chart.target().factory().last_options.lock().clone().unwrap();
    assert_eq!(options.value["width"].as_f64(), Some(300.0));
    assert_eq!(options.value["height"].as_f64(), Some(200.0 - 27.0 - 50.0));
}

#[test]
fn test_data_operations_reach_engine() {
    let (mut chart, log) = chart_with(FakeFactory::default());
    chart.create_chart(json!({}), Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "plot-root")).unwrap();

    chart.push_data(&[4.0, 8.0]).unwrap();
    chart.slice_series(0, 2.0, 3.0).unwrap();

    assert_eq!(chart.data().series(), &[vec![2.0, 3.0], vec![6.0, 7.0]]);
    assert_eq!(log.calls()[1..], ["set_data:4", "set_data:2"]);
}

#[test]
fn test_slice_on_missing_axis_is_an_error() {
    let (mut chart, _log) = chart_with(FakeFactory::default());
    chart.set_data(sample()).unwrap();

    let err = chart.slice_series(5, 0.0, 1.0).unwrap_err();
    assert!(matches!(err, BridgeError::AxisOutOfRange { axis: 5, series: 2 }));
}

#[test]
fn test_engine_failure_propagates() {
    let (mut chart, _log) = chart_with(FakeFactory {
        fail: true,
        ..Default::default()
    });
    chart.create_chart(json!({}), Some(sample()), None).unwrap();

    let err = chart.attach_mount(element(1, "plot-root")).unwrap_err();
    assert!(matches!(err, BridgeError::Engine(_)));
    assert!(err.to_string().contains("engine rejected options"));
}

#[test]
fn test_mount_replacement_rebuilds_engine() {
    let (mut chart, log) = chart_with(FakeFactory::default());
    chart.create_chart(json!({}), Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "first")).unwrap();
    chart.set_variable("threshold", json!(3)).unwrap();

    chart.attach_mount(element(2, "second")).unwrap();

    assert_eq!(chart.state(), LifecycleState::Ready);
    assert_eq!(
        log.calls(),
        vec!["create:first:3", "destroy", "create:second:3"]
    );
    assert_eq!(chart.target().globals()["threshold"], json!(3));
}

#[test]
fn test_callables_bind_to_registered_functions() {
    let factory = FakeFactory::default();
    let mut target = InProcessTarget::new(factory);
    target
        .registry_mut()
        .register("fmtTick", |args: &[Value]| {
            json!(format!("{}ms", args.first().cloned().unwrap_or(Value::Null)))
        });
    let mut chart = Chart::new("callables", target, BridgeConfig::default()).unwrap();

    let options = json!({
        "axes": [{ "values": Callable::named("fmtTick") }],
        "hooks": { "draw": Callable::named("notThere") }
    });
    chart.create_chart(options, Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "plot-root")).unwrap();

    let resolved = chart.target().factory().last_options.lock().clone().unwrap();
    assert_eq!(resolved.unresolved, vec!["notThere"]);
    assert_eq!(resolved.value["hooks"]["draw"], Value::Null);

    let tick = resolved.function_at("/axes/0/values").unwrap();
    assert_eq!(tick(&[json!(5)][..]), json!("5ms"));
}

#[test]
fn test_destroy_keeps_or_drops_data() {
    let (mut chart, log) = chart_with(FakeFactory::default());
    chart.create_chart(json!({}), Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "plot-root")).unwrap();

    chart.destroy(true).unwrap();
    assert!(!chart.target().has_engine());
    chart.create_chart(json!({}), None, None).unwrap();
    assert_eq!(log.calls().last().map(String::as_str), Some("create:plot-root:3"));

    chart.destroy(false).unwrap();
    chart.create_chart(json!({}), None, None).unwrap();
    assert_eq!(log.calls().last().map(String::as_str), Some("create:plot-root:0"));
}

#[test]
fn test_options_changed_while_detached_rebuild_engine() {
    let (mut chart, log) = chart_with(FakeFactory::default());
    chart.create_chart(json!({ "title": "old" }), Some(sample()), None).unwrap();
    chart.attach_mount(element(1, "root")).unwrap();

    chart.attach_mount(None).unwrap();
    chart.update_options(json!({ "title": "new" })).unwrap();
    assert!(!chart.target().has_engine());

    chart.attach_mount(element(1, "root")).unwrap();

    assert_eq!(chart.state(), LifecycleState::Ready);
    assert_eq!(log.calls(), vec!["create:root:3", "destroy", "create:root:3"]);
    let options = chart.target().factory().last_options.lock().clone().unwrap();
    assert_eq!(options.value["title"], "new");
}
