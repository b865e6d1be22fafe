//! Serialization of chart options across the context boundary
//!
//! Callable values cannot travel as data. A [`Callable`] serializes to the
//! sentinel string `function(<name>)`; the receiving side resolves the name
//! against functions it registered itself. Resolution is an explicit step
//! ([`resolve_options`]) that degrades unknown names to `null` instead of
//! failing the whole configuration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use cb_core::BridgeResult;

/// Prefix of a callable sentinel
pub const CALLABLE_PREFIX: &str = "function(";

/// Suffix of a callable sentinel
pub const CALLABLE_SUFFIX: &str = ")";

const ANONYMOUS: &str = "anonymous";

/// A function-valued option, transmitted by name only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callable {
    name: Option<String>,
}

impl Callable {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// A callable without a name; it can never be resolved remotely
    pub fn anonymous() -> Self {
        Self { name: None }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS)
    }

    /// Sentinel text standing in for this callable
    pub fn sentinel(&self) -> String {
        format!("{}{}{}", CALLABLE_PREFIX, self.name(), CALLABLE_SUFFIX)
    }
}

impl Serialize for Callable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.sentinel())
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Value::String(callable.sentinel())
    }
}

/// Name carried by a sentinel string, if `text` is one
pub fn sentinel_name(text: &str) -> Option<&str> {
    let name = text.strip_prefix(CALLABLE_PREFIX)?.strip_suffix(CALLABLE_SUFFIX)?;
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    valid.then_some(name)
}

/// Every callable name referenced anywhere in `options`, in document order
pub fn referenced_callables(options: &Value) -> Vec<String> {
    let mut names = Vec::new();
    visit_strings(options, &mut String::new(), &mut |_, text| {
        if let Some(name) = sentinel_name(text) {
            names.push(name.to_string());
        }
    });
    names
}

fn visit_strings(value: &Value, pointer: &mut String, visit: &mut dyn FnMut(&str, &str)) {
    match value {
        Value::String(text) => visit(pointer, text),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&index.to_string());
                visit_strings(item, pointer, visit);
                pointer.truncate(len);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
                visit_strings(item, pointer, visit);
                pointer.truncate(len);
            }
        }
        _ => {}
    }
}

/// A native function an in-process engine can call back into
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Named functions available on the decoding side
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, NativeFn>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// A callable located in the options tree and bound to a registered function
#[derive(Clone)]
pub struct BoundCallable {
    /// JSON pointer to the option field
    pub pointer: String,
    pub name: String,
    pub function: NativeFn,
}

impl fmt::Debug for BoundCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCallable")
            .field("pointer", &self.pointer)
            .field("name", &self.name)
            .finish()
    }
}

/// Options after sentinel resolution
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// Plain options; unresolved callable fields are `null`
    pub value: Value,

    /// Callables bound to registered functions
    pub bound: Vec<BoundCallable>,

    /// Names no function was registered for
    pub unresolved: Vec<String>,
}

impl ResolvedOptions {
    /// The function bound at a JSON pointer, e.g. `/axes/0/values`
    pub fn function_at(&self, pointer: &str) -> Option<&NativeFn> {
        self.bound.iter().find(|b| b.pointer == pointer).map(|b| &b.function)
    }
}

/// Resolve every sentinel in `options` against `registry`.
///
/// Bound sentinels stay in `value` (as their sentinel text) and are listed
/// in `bound`; unknown names are nulled and reported.
pub fn resolve_options(options: &Value, registry: &FunctionRegistry) -> ResolvedOptions {
    let mut value = options.clone();
    let mut bound = Vec::new();
    let mut unresolved = Vec::new();
    let mut missing_pointers = Vec::new();

    visit_strings(options, &mut String::new(), &mut |pointer, text| {
        let Some(name) = sentinel_name(text) else {
            return;
        };
        match registry.get(name) {
            Some(function) => bound.push(BoundCallable {
                pointer: pointer.to_string(),
                name: name.to_string(),
                function: Arc::clone(function),
            }),
            None => {
                unresolved.push(name.to_string());
                missing_pointers.push(pointer.to_string());
            }
        }
    });

    for pointer in &missing_pointers {
        if let Some(slot) = value.pointer_mut(pointer) {
            *slot = Value::Null;
        }
    }
    for name in &unresolved {
        tracing::warn!("Callable '{}' is not registered; option degraded to null", name);
    }

    ResolvedOptions {
        value,
        bound,
        unresolved,
    }
}

/// Encode options as JSON text (callables already appear as sentinels)
pub fn encode_options<T: Serialize>(options: &T) -> BridgeResult<String> {
    Ok(serde_json::to_string(options)?)
}

/// Parse options text and resolve its sentinels
pub fn decode_options(text: &str, registry: &FunctionRegistry) -> BridgeResult<ResolvedOptions> {
    let value: Value = serde_json::from_str(text)?;
    Ok(resolve_options(&value, registry))
}

/// Render a value as a script literal.
///
/// JSON is valid script syntax except for the two line separators, which
/// older engines reject inside string literals.
pub fn js_literal<T: Serialize + ?Sized>(value: &T) -> BridgeResult<String> {
    let text = serde_json::to_string(value)?;
    Ok(text.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029"))
}
