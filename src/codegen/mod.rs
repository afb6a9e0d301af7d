pub mod class;

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::parser::schema::{PluginSchema, RUST_KEYWORDS};

static NON_WORD_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

/// Names imported into, or declared next to, every category module.
const RUNTIME_NAMES: &[&str] = &[
    "Dict",
    "Plugin",
    "PluginRef",
    "Ref",
    "Rgb",
    "Scene",
    "SceneBuilder",
    "Spectrum",
    "Transform",
    "TransformOp",
    "Value",
];

/// Prelude names the generated code refers to unqualified.
const PRELUDE_NAMES: &[&str] = &[
    "Box", "Default", "Err", "From", "Into", "None", "Ok", "Option", "Result", "Self", "Some",
    "String", "Vec",
];

/// Module files the runtime occupies in the output directory.
const RUNTIME_MODULES: &[&str] = &["mod", "plugin", "scene", "transform"];

/// Source of one category module.
#[derive(Debug, Clone)]
pub struct ModuleSource {
    /// Type names in emission order.
    pub classes: Vec<String>,
    pub source: String,
}

/// `"Phase Functions"` → `phase_functions`.
pub fn module_name(category: &str) -> String {
    let lowered = NON_WORD_RUN_RE.replace_all(&category.to_lowercase(), "_").to_string();
    let mut name = lowered.trim_matches('_').to_string();
    if name.is_empty() {
        name = "plugins".into();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name = format!("plugins_{}", name);
    }
    if RUNTIME_MODULES.contains(&name.as_str()) || RUST_KEYWORDS.contains(&name.as_str()) {
        name.push_str("_plugins");
    }
    name
}

fn type_name(schema: &PluginSchema) -> String {
    let name = schema.class_name.as_str();
    if RUNTIME_NAMES.contains(&name) || PRELUDE_NAMES.contains(&name) {
        format!("{}Plugin", schema.class_name)
    } else {
        schema.class_name.clone()
    }
}

/// Render every plugin of one category. A type name seen twice keeps the
/// first definition.
pub fn render_module(category: &str, url: &str, schemas: &[PluginSchema]) -> ModuleSource {
    let mut out = String::new();
    let _ = writeln!(out, "//! Category: {}", category);
    let _ = writeln!(out, "//!");
    let _ = writeln!(out, "//! Generated from <{}>. Do not edit.", url);
    let _ = writeln!(out);
    let _ = writeln!(out, "#[allow(unused_imports)]");
    let _ = writeln!(out, "use super::plugin::{{Plugin, PluginRef, Spectrum, Value}};");
    let _ = writeln!(out, "#[allow(unused_imports)]");
    let _ = writeln!(out, "use super::transform::Transform;");

    let mut seen = HashSet::new();
    let mut classes = Vec::new();
    for schema in schemas {
        let name = type_name(schema);
        if !seen.insert(name.clone()) {
            warn!("{}: type {} already defined, skipping {}", category, name, schema.slug);
            continue;
        }
        let _ = writeln!(out);
        out.push_str(&class::render_class(schema, &name));
        classes.push(name);
    }

    ModuleSource {
        classes,
        source: out,
    }
}

/// Render the aggregator. `modules` maps module name → its type names.
///
/// Types defined in exactly one module are re-exported at the top level;
/// a name shared by several modules stays reachable through its module path.
pub fn render_mod_rs(overview_url: &str, modules: &BTreeMap<String, Vec<String>>) -> String {
    let mut owners: BTreeMap<&str, usize> = BTreeMap::new();
    for classes in modules.values() {
        for class in classes {
            *owners.entry(class.as_str()).or_default() += 1;
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "//! Scene description types for Mitsuba 3 plugins.");
    let _ = writeln!(out, "//!");
    let _ = writeln!(out, "//! Generated from <{}>. Do not edit.", overview_url);
    let _ = writeln!(out, "//!");
    let _ = writeln!(out, "//! Requires the `glam`, `indexmap`, `serde` and `tracing` crates.");
    let _ = writeln!(out);
    let _ = writeln!(out, "pub mod plugin;");
    let _ = writeln!(out, "pub mod scene;");
    let _ = writeln!(out, "pub mod transform;");
    let _ = writeln!(out);
    for module in modules.keys() {
        let _ = writeln!(out, "pub mod {};", module);
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "pub use plugin::{{serialize, Dict, Plugin, PluginRef, Ref, Rgb, Spectrum, Value}};"
    );
    let _ = writeln!(out, "pub use scene::{{Scene, SceneBuilder}};");
    let _ = writeln!(out, "pub use transform::{{Transform, TransformOp}};");

    for (module, classes) in modules {
        let mut unique: Vec<&str> = classes
            .iter()
            .map(String::as_str)
            .filter(|c| owners.get(c) == Some(&1))
            .collect();
        if unique.is_empty() {
            continue;
        }
        unique.sort_unstable();
        let _ = writeln!(out, "pub use {}::{{{}}};", module, unique.join(", "));
    }

    out
}

// ── Tests ──
