//! Bootstrap material for the remote host page
//!
//! The preamble must run before any command: it defines the `window.__cb`
//! namespace, the sentinel resolver, the window helper, console forwarding
//! and the engine wait used by the create command.

use cb_core::{BootstrapConfig, BridgeResult};

use crate::codec::{js_literal, CALLABLE_PREFIX, CALLABLE_SUFFIX};

const PREAMBLE: &str = r#"(function() {
  var cb = window.__cb = window.__cb || { queue: [] };
  cb.queue = cb.queue || [];

  cb.post = function(type, data) {
    try {
      var payload = JSON.stringify({ type: type, data: data });
      if (window.ReactNativeWebView) { window.ReactNativeWebView.postMessage(payload); }
      else if (window.ipc) { window.ipc.postMessage(payload); }
      else if (window.parent !== window) { window.parent.postMessage(payload, '*'); }
    } catch (e) {}
  };

  ['log', 'debug', 'info', 'warn', 'error'].forEach(function(level) {
    var original = console[level];
    console[level] = function() {
      var args = Array.prototype.slice.call(arguments);
      cb.post('Console', { level: level, args: args });
      if (original) { original.apply(console, args); }
    };
  });

  cb.parseOptions = function(text) {
    return JSON.parse(text, function(key, value) {
      if (typeof value !== 'string') return value;
      if (value.indexOf(__PREFIX__) !== 0 || value.slice(-__SUFFIX__.length) !== __SUFFIX__) return value;
      var name = value.slice(__PREFIX__.length, value.length - __SUFFIX__.length);
      if (typeof window[name] === 'function') return window[name];
      console.error('Unresolved callable: ' + name);
      return undefined;
    });
  };

  cb.sliceWindow = function(data, axis, min, max) {
    var xs = data[axis] || [];
    var start = -1, end = -1;
    for (var i = 0; i < xs.length; i++) {
      if (xs[i] >= min && xs[i] <= max) { if (start < 0) start = i; end = i; }
    }
    return data.map(function(series) {
      return start < 0 ? [] : series.slice(start, end + 1);
    });
  };

  cb.flush = function() {
    var pending = cb.queue;
    cb.queue = [];
    for (var i = 0; i < pending.length; i++) {
      try { pending[i](); } catch (e) { console.error('Queued command failed: ' + e); }
    }
  };

  cb.whenEngineReady = function(callback) {
    if (window[__ENGINE__]) { callback(); return; }
    var waited = 0;
    var timer = setInterval(function() {
      waited += __POLL__;
      if (window[__ENGINE__]) { clearInterval(timer); callback(); }
      else if (waited >= __TIMEOUT__) {
        clearInterval(timer);
        console.error('Engine runtime not available after ' + waited + 'ms');
        cb.post('Error', 'engine runtime unavailable');
      }
    }, __POLL__);
  };
})();
true;"#;

/// Render the utility preamble for `bootstrap`
pub fn preamble(bootstrap: &BootstrapConfig) -> BridgeResult<String> {
    Ok(PREAMBLE
        .replace("__PREFIX__", &js_literal(CALLABLE_PREFIX)?)
        .replace("__SUFFIX__", &js_literal(CALLABLE_SUFFIX)?)
        .replace("__ENGINE__", &js_literal(&bootstrap.engine_global)?)
        .replace("__POLL__", &bootstrap.poll_interval_ms.to_string())
        .replace("__TIMEOUT__", &bootstrap.wait_timeout_ms.to_string()))
}

/// Preamble followed by the caller's own injected script
pub fn injected_script(bootstrap: &BootstrapConfig, extra: Option<&str>) -> BridgeResult<String> {
    let mut script = preamble(bootstrap)?;
    if let Some(extra) = extra.filter(|s| !s.trim().is_empty()) {
        script.push('\n');
        script.push_str(extra);
        script.push_str(";\ntrue;");
    }
    Ok(script)
}

/// Static host document: engine assets, mount element and preamble.
///
/// `engine_js`/`engine_css` are embedded verbatim; a closing tag inside them
/// is escaped so it cannot end the element early.
pub fn host_page(
    engine_js: &str,
    engine_css: &str,
    bootstrap: &BootstrapConfig,
) -> BridgeResult<String> {
    let mount_id = bootstrap
        .mount_element_id
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;");

    Ok(format!(
        "<!DOCTYPE html>\n\
         <html>\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1, maximum-scale=1\">\n\
         <style>\nhtml, body {{ margin: 0; padding: 0; overflow: hidden; }}\n{css}\n</style>\n\
         <script>\n{js}\n</script>\n\
         <script>\n{preamble}\n</script>\n\
         </head>\n<body>\n<div id=\"{mount}\"></div>\n</body>\n</html>\n",
        css = engine_css.replace("</style", "<\\/style"),
        js = engine_js.replace("</script", "<\\/script"),
        preamble = preamble(bootstrap)?,
        mount = mount_id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_substitutes_contract() {
        let bootstrap = BootstrapConfig {
            engine_global: "Plotter".to_string(),
            wait_timeout_ms: 1500,
            poll_interval_ms: 25,
            ..Default::default()
        };
        let script = preamble(&bootstrap).unwrap();
        assert!(script.contains("window[\"Plotter\"]"));
        assert!(script.contains("waited >= 1500"));
        assert!(script.contains("}, 25);"));
        assert!(script.contains("value.indexOf(\"function(\")"));
        assert!(!script.contains("__ENGINE__"));
        assert!(!script.contains("__TIMEOUT__"));
    }

    #[test]
    fn test_injected_script_appends_caller_code() {
        let script = injected_script(&BootstrapConfig::default(), Some("window.fmt = 1")).unwrap();
        assert!(script.ends_with("window.fmt = 1;\ntrue;"));

        let bare = injected_script(&BootstrapConfig::default(), Some("  ")).unwrap();
        assert_eq!(bare, preamble(&BootstrapConfig::default()).unwrap());
    }

    #[test]
    fn test_host_page_embeds_assets() {
        let page = host_page(
            "var uPlot = {};</script>",
            ".u-legend {}",
            &BootstrapConfig::default(),
        )
        .unwrap();
        assert!(page.contains("<div id=\"chart\"></div>"));
        assert!(page.contains("var uPlot = {};<\\/script>"));
        assert!(page.contains(".u-legend {}"));
        assert!(page.contains("cb.whenEngineReady"));
    }
}
