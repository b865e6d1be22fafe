//! Container measurement and plot-area computation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cb_core::Margins;

/// Width and height in layout units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Viewport assumed until the host reports a layout
pub const FALLBACK_VIEWPORT: Size = Size {
    width: 800.0,
    height: 600.0,
};

/// Caller styling of the container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStyle {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub background_color: Option<String>,
}

/// Outcome of a dimension computation
#[derive(Debug, Clone, PartialEq)]
pub struct Dimensions {
    /// Options with `width`/`height` set to the plot area
    pub options: Value,
    /// Space the container occupies
    pub container: Size,
    /// Space left for the plot after band reservations
    pub plot: Size,
}

fn positive(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| *v > 0.0)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Plot area left inside `container` once the title and legend bands are
/// reserved.
///
/// The title band applies when `options.title` is set; the legend band
/// applies unless `options.legend.show` is set.
pub fn plot_area(options: &Value, container: Size, margins: &Margins) -> Size {
    let mut height = container.height;
    if truthy(options.get("title")) {
        height -= margins.title;
    }
    if !truthy(options.pointer("/legend/show")) {
        height -= margins.legend;
    }
    Size::new(container.width, height.max(0.0))
}

/// Resolve the container from options, style and viewport, then the plot area
pub fn compute_dimensions(
    options: &Value,
    style: &ContainerStyle,
    viewport: Size,
    margins: &Margins,
) -> Dimensions {
    let width = positive(options.get("width"))
        .or(style.width.filter(|w| *w > 0.0))
        .unwrap_or(viewport.width)
        .min(viewport.width);
    let height = positive(options.get("height"))
        .or(style.height.filter(|h| *h > 0.0))
        .unwrap_or(viewport.height)
        .min(viewport.height);

    let container = Size::new(width, height);
    let plot = plot_area(options, container, margins);

    let mut options = options.clone();
    if let Value::Object(map) = &mut options {
        map.insert("width".to_string(), Value::from(plot.width));
        map.insert("height".to_string(), Value::from(plot.height));
    }

    Dimensions {
        options,
        container,
        plot,
    }
}

/// Turns layout events into resize requests
#[derive(Debug, Clone)]
pub struct DimensionCoordinator {
    margins: Margins,
    style: ContainerStyle,
    viewport: Option<Size>,
    last_plot: Option<Size>,
}

impl DimensionCoordinator {
    pub fn new(margins: Margins) -> Self {
        Self {
            margins,
            style: ContainerStyle::default(),
            viewport: None,
            last_plot: None,
        }
    }

    pub fn set_style(&mut self, style: ContainerStyle) {
        self.style = style;
    }

    pub fn style(&self) -> &ContainerStyle {
        &self.style
    }

    pub fn margins(&self) -> &Margins {
        &self.margins
    }

    /// Last measured viewport, if any layout was reported
    pub fn viewport(&self) -> Option<Size> {
        self.viewport
    }

    /// Dimensions for creating an instance now
    pub fn dimensions(&mut self, options: &Value) -> Dimensions {
        let viewport = self.viewport.unwrap_or_else(|| {
            tracing::debug!("No layout reported yet, using fallback viewport");
            FALLBACK_VIEWPORT
        });
        let dimensions = compute_dimensions(options, &self.style, viewport, &self.margins);
        self.last_plot = Some(dimensions.plot);
        dimensions
    }

    /// Record a layout measurement; returns the plot size to resize to when
    /// it changed.
    pub fn on_layout(&mut self, options: &Value, viewport: Size) -> Option<Size> {
        self.viewport = Some(viewport);
        let plot = compute_dimensions(options, &self.style, viewport, &self.margins).plot;
        if self.last_plot == Some(plot) {
            return None;
        }
        self.last_plot = Some(plot);
        Some(plot)
    }

    /// Forget the last issued size
    pub fn reset(&mut self) {
        self.last_plot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VIEWPORT: Size = Size { width: 400.0, height: 300.0 };

    #[test]
    fn test_title_without_legend_show_reserves_both() {
        let dims = compute_dimensions(
            &json!({ "title": "CPU" }),
            &ContainerStyle::default(),
            VIEWPORT,
            &Margins::default(),
        );
        assert_eq!(dims.container, VIEWPORT);
        assert_eq!(dims.plot, Size::new(400.0, 300.0 - 27.0 - 50.0));
        assert_eq!(dims.options["height"], json!(223.0));
        assert_eq!(dims.options["title"], "CPU");
    }

    #[test]
    fn test_legend_show_reserves_only_title() {
        let dims = compute_dimensions(
            &json!({ "title": "CPU", "legend": { "show": true } }),
            &ContainerStyle::default(),
            VIEWPORT,
            &Margins::default(),
        );
        assert_eq!(dims.plot.height, 300.0 - 27.0);
    }

    #[test]
    fn test_custom_margins() {
        let margins = Margins { title: 10.0, legend: 20.0 };
        let plot = plot_area(&json!({ "title": "x" }), VIEWPORT, &margins);
        assert_eq!(plot.height, 270.0);
    }

    #[test]
    fn test_options_then_style_then_viewport_clamped() {
        let style = ContainerStyle {
            width: Some(250.0),
            height: Some(900.0),
            ..Default::default()
        };
        let dims = compute_dimensions(
            &json!({ "width": 200, "legend": { "show": true } }),
            &style,
            VIEWPORT,
            &Margins::default(),
        );
        assert_eq!(dims.container, Size::new(200.0, 300.0));

        let dims = compute_dimensions(&json!({}), &style, VIEWPORT, &Margins::default());
        assert_eq!(dims.container.width, 250.0);
    }

    #[test]
    fn test_plot_height_never_negative() {
        let plot = plot_area(&json!({ "title": "t" }), Size::new(10.0, 30.0), &Margins::default());
        assert_eq!(plot.height, 0.0);
    }

    #[test]
    fn test_coordinator_only_reports_changes() {
        let mut coordinator = DimensionCoordinator::new(Margins::default());
        let options = json!({ "legend": { "show": true } });
        assert_eq!(coordinator.on_layout(&options, VIEWPORT), Some(VIEWPORT));
        assert_eq!(coordinator.on_layout(&options, VIEWPORT), None);
        assert_eq!(
            coordinator.on_layout(&options, Size::new(500.0, 300.0)),
            Some(Size::new(500.0, 300.0))
        );
    }
}
