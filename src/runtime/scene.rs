use indexmap::IndexMap;
use tracing::warn;

use super::plugin::{serialize, Dict, Plugin, PluginRef, Ref, Value};

/// Top-level scene: an integrator, sensors, and keyed shapes, emitters,
/// media and shared assets.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub integrator: Option<PluginRef>,
    pub sensors: Vec<PluginRef>,
    pub shapes: IndexMap<String, PluginRef>,
    pub emitters: IndexMap<String, PluginRef>,
    pub media: IndexMap<String, PluginRef>,
    pub assets: IndexMap<String, PluginRef>,
    pub id: Option<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared asset and return a reference to it. An asset
    /// without an id is named `asset_<n>`, counting from one.
    pub fn add_asset(&mut self, mut plugin: impl Plugin + 'static) -> Ref {
        let id = match plugin.plugin_id() {
            Some(id) => id.to_string(),
            None => {
                let id = format!("asset_{}", self.assets.len() + 1);
                plugin.set_plugin_id(id.clone());
                id
            }
        };
        self.assets.insert(id.clone(), PluginRef::new(plugin));
        Ref::new(id)
    }

    pub fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        dict.insert("type".into(), Value::String("scene".into()));

        if let Some(integrator) = &self.integrator {
            insert(&mut dict, "integrator", integrator);
        }

        match self.sensors.as_slice() {
            [sensor] => insert(&mut dict, "sensor", sensor),
            sensors => {
                for (i, sensor) in sensors.iter().enumerate() {
                    insert(&mut dict, &format!("sensor_{}", i), sensor);
                }
            }
        }

        for group in [&self.shapes, &self.emitters, &self.media, &self.assets] {
            for (key, plugin) in group {
                insert(&mut dict, key, plugin);
            }
        }

        if let Some(id) = &self.id {
            dict.insert("id".into(), Value::String(id.clone()));
        }
        dict
    }
}

/// Later entries replace earlier ones under the same key.
fn insert(dict: &mut Dict, key: &str, plugin: &PluginRef) {
    let value = serialize(&Value::Plugin(plugin.clone()));
    if dict.insert(key.to_string(), value).is_some() {
        warn!("Scene key {:?} defined more than once, keeping the last", key);
    }
}

/// Fluent scene construction.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    scene: Scene,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn integrator(mut self, plugin: impl Into<PluginRef>) -> Self {
        self.scene.integrator = Some(plugin.into());
        self
    }

    pub fn sensor(mut self, plugin: impl Into<PluginRef>) -> Self {
        self.scene.sensors.push(plugin.into());
        self
    }

    pub fn shape(mut self, key: impl Into<String>, plugin: impl Into<PluginRef>) -> Self {
        self.scene.shapes.insert(key.into(), plugin.into());
        self
    }

    pub fn emitter(mut self, key: impl Into<String>, plugin: impl Into<PluginRef>) -> Self {
        self.scene.emitters.insert(key.into(), plugin.into());
        self
    }

    pub fn medium(mut self, key: impl Into<String>, plugin: impl Into<PluginRef>) -> Self {
        self.scene.media.insert(key.into(), plugin.into());
        self
    }

    /// Keyed by the plugin's id, or auto-named like [`Scene::add_asset`].
    pub fn asset(mut self, plugin: impl Plugin + 'static) -> Self {
        self.scene.add_asset(plugin);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.scene.id = Some(id.into());
        self
    }

    /// Register a shared asset mid-build; see [`Scene::add_asset`].
    pub fn add_asset(&mut self, plugin: impl Plugin + 'static) -> Ref {
        self.scene.add_asset(plugin)
    }

    pub fn build(self) -> Scene {
        self.scene
    }
}
