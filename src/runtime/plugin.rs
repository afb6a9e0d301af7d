use std::fmt;
use std::rc::Rc;

use glam::DMat4;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use tracing::debug;

use super::transform::Transform;

/// Ordered scene-description mapping.
pub type Dict = IndexMap<String, Value>;

/// A value that can appear in a scene description.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Dict),
    Transform(Transform),
    /// Native 4×4 matrix, the renderer-side form of a transform.
    Matrix(DMat4),
    Plugin(PluginRef),
}

/// A scene object the renderer instantiates from its mapping form.
pub trait Plugin: fmt::Debug {
    /// Renderer type name, e.g. `"diffuse"`.
    fn plugin_type(&self) -> &str;

    fn plugin_id(&self) -> Option<&str>;

    fn set_plugin_id(&mut self, id: String);

    /// Parameter wire keys with their current values, in declaration order.
    /// Unset optional parameters are `None`.
    fn fields(&self) -> Vec<(&'static str, Option<Value>)>;

    /// Mapping form: `type`, then `id` when set, then every set field
    /// serialized. Fields keyed `type` or `id` are not written.
    fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        dict.insert("type".into(), Value::String(self.plugin_type().to_string()));
        if let Some(id) = self.plugin_id() {
            dict.insert("id".into(), Value::String(id.to_string()));
        }
        for (key, value) in self.fields() {
            let Some(value) = value else {
                continue;
            };
            if key == "type" || key == "id" {
                debug!(
                    "{}: field {:?} is set but not written, the key is reserved",
                    self.plugin_type(),
                    key
                );
                continue;
            }
            dict.insert(key.to_string(), serialize(&value));
        }
        dict
    }
}

/// Shared handle to any plugin value.
#[derive(Debug, Clone)]
pub struct PluginRef(Rc<dyn Plugin>);

impl PluginRef {
    pub fn new(plugin: impl Plugin + 'static) -> Self {
        Self(Rc::new(plugin))
    }

    pub fn get(&self) -> &dyn Plugin {
        self.0.as_ref()
    }

    pub fn plugin_type(&self) -> &str {
        self.0.plugin_type()
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.0.plugin_id()
    }

    pub fn to_dict(&self) -> Dict {
        self.0.to_dict()
    }
}

impl<P: Plugin + 'static> From<P> for PluginRef {
    fn from(plugin: P) -> Self {
        Self::new(plugin)
    }
}

impl PartialEq for PluginRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.to_dict() == other.to_dict()
    }
}

/// Literal RGB color plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct Rgb {
    pub id: Option<String>,
    pub value: [f64; 3],
}

impl Rgb {
    pub fn new(value: [f64; 3]) -> Self {
        Self { id: None, value }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0])
    }
}

impl Plugin for Rgb {
    fn plugin_type(&self) -> &str {
        "rgb"
    }

    fn plugin_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_plugin_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn fields(&self) -> Vec<(&'static str, Option<Value>)> {
        vec![("value", Some(Value::from(self.value)))]
    }
}

/// Reference to a plugin declared elsewhere in the scene by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Ref {
    pub id: String,
}

impl Ref {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Plugin for Ref {
    fn plugin_type(&self) -> &str {
        "ref"
    }

    fn plugin_id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn set_plugin_id(&mut self, id: String) {
        self.id = id;
    }

    fn fields(&self) -> Vec<(&'static str, Option<Value>)> {
        Vec::new()
    }
}

/// Spectrum-valued parameter: a uniform value, an RGB triplet, or a
/// texture-like plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum Spectrum {
    Uniform(f64),
    Rgb([f64; 3]),
    Plugin(PluginRef),
}

impl From<f64> for Spectrum {
    fn from(v: f64) -> Self {
        Spectrum::Uniform(v)
    }
}

impl From<[f64; 3]> for Spectrum {
    fn from(v: [f64; 3]) -> Self {
        Spectrum::Rgb(v)
    }
}

impl From<PluginRef> for Spectrum {
    fn from(v: PluginRef) -> Self {
        Spectrum::Plugin(v)
    }
}

impl<P: Plugin + 'static> From<P> for Spectrum {
    fn from(v: P) -> Self {
        Spectrum::Plugin(PluginRef::new(v))
    }
}

impl From<Spectrum> for Value {
    fn from(v: Spectrum) -> Self {
        match v {
            Spectrum::Uniform(f) => Value::Float(f),
            Spectrum::Rgb(rgb) => Value::Plugin(PluginRef::new(Rgb::new(rgb))),
            Spectrum::Plugin(p) => Value::Plugin(p),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Value::List(v.into_iter().map(Value::Float).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Dict> for Value {
    fn from(v: Dict) -> Self {
        Value::Map(v)
    }
}

impl From<Transform> for Value {
    fn from(v: Transform) -> Self {
        Value::Transform(v)
    }
}

impl From<DMat4> for Value {
    fn from(v: DMat4) -> Self {
        Value::Matrix(v)
    }
}

impl From<PluginRef> for Value {
    fn from(v: PluginRef) -> Self {
        Value::Plugin(v)
    }
}

/// Convert a value to scene-description form: plugins become mappings,
/// transforms become native matrices, containers are converted element-wise.
pub fn serialize(value: &Value) -> Value {
    match value {
        Value::Plugin(p) => Value::Map(p.to_dict()),
        Value::Transform(t) => Value::Matrix(t.to_native()),
        Value::List(items) => Value::List(items.iter().map(serialize).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), serialize(v)))
                .collect(),
        ),
        Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::String(_)
        | Value::Matrix(_) => value.clone(),
    }
}

/// Row-major nested arrays.
fn matrix_rows(m: &DMat4) -> [[f64; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Transform(t) => matrix_rows(&t.to_native()).serialize(serializer),
            Value::Matrix(m) => matrix_rows(m).serialize(serializer),
            Value::Plugin(p) => serializer.collect_map(p.to_dict()),
        }
    }
}
