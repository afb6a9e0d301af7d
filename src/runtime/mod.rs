//! Scene runtime shared by every synthesized plugin module. The files are
//! also emitted verbatim next to the generated code.

pub mod plugin;
pub mod scene;
pub mod transform;

pub use plugin::{serialize, Dict, Plugin, PluginRef, Ref, Rgb, Spectrum, Value};
pub use scene::{Scene, SceneBuilder};
pub use transform::{Transform, TransformOp};

pub const PLUGIN_SOURCE: &str = include_str!("plugin.rs");
pub const SCENE_SOURCE: &str = include_str!("scene.rs");
pub const TRANSFORM_SOURCE: &str = include_str!("transform.rs");
