//! Bridge configuration

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Height reserved above the plot for the title band
pub const MARGIN_TITLE: f64 = 27.0;

/// Height reserved below the plot for the legend band
pub const MARGIN_LEGEND: f64 = 50.0;

/// Band reservations subtracted from the container height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    /// Reserved when the options carry a title
    pub title: f64,

    /// Reserved unless the options enable `legend.show`
    pub legend: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            title: MARGIN_TITLE,
            legend: MARGIN_LEGEND,
        }
    }
}

/// Contract with the remote host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// DOM id of the element the engine mounts into
    pub mount_element_id: String,

    /// Global the engine runtime defines once loaded
    pub engine_global: String,

    /// How long a create command waits for the engine global
    pub wait_timeout_ms: u64,

    /// Polling period while waiting
    pub poll_interval_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            mount_element_id: "chart".to_string(),
            engine_global: "uPlot".to_string(),
            wait_timeout_ms: 1000,
            poll_interval_ms: 10,
        }
    }
}

/// Top-level configuration for a chart bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub margins: Margins,

    pub bootstrap: BootstrapConfig,

    /// Page background used when the caller supplies none
    pub background_color: String,

    /// Caller script appended to the remote preamble
    pub injected_script: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            bootstrap: BootstrapConfig::default(),
            background_color: "transparent".to_string(),
            injected_script: None,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a configuration from JSON text.
    ///
    /// Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> BridgeResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a host could get wrong
    pub fn validate(&self) -> BridgeResult<()> {
        if self.margins.title < 0.0 || self.margins.legend < 0.0 {
            return Err(BridgeError::Config(format!(
                "margins must be non-negative (title {}, legend {})",
                self.margins.title, self.margins.legend
            )));
        }
        if self.bootstrap.poll_interval_ms == 0 {
            return Err(BridgeError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.bootstrap.mount_element_id.is_empty() {
            return Err(BridgeError::Config("mount_element_id must not be empty".to_string()));
        }
        Ok(())
    }
}
