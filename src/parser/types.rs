use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Semantic kind of a documented plugin parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    Float,
    Int,
    Bool,
    String,
    /// RGB triplet.
    Color,
    /// A spectrum value, or a plugin (texture) producing one.
    Spectrum,
    Transform,
    /// Nested plugin; also the fallback for anything unrecognized.
    Plugin,
}

impl CanonicalType {
    /// Field type in synthesized code.
    pub fn rust_type(self) -> &'static str {
        match self {
            CanonicalType::Float => "f64",
            CanonicalType::Int => "i64",
            CanonicalType::Bool => "bool",
            CanonicalType::String => "String",
            CanonicalType::Color => "[f64; 3]",
            CanonicalType::Spectrum => "Spectrum",
            CanonicalType::Transform => "Transform",
            CanonicalType::Plugin => "PluginRef",
        }
    }

    pub fn is_copy(self) -> bool {
        matches!(
            self,
            CanonicalType::Float | CanonicalType::Int | CanonicalType::Bool | CanonicalType::Color
        )
    }
}

// Order matters: first match wins.
static TYPE_RULES: LazyLock<Vec<(Regex, CanonicalType)>> = LazyLock::new(|| {
    [
        (r"\bfloat\b|\bdouble\b|\bscalar\b", CanonicalType::Float),
        (r"\bint(eger)?\b", CanonicalType::Int),
        (r"\bbool(ean)?\b", CanonicalType::Bool),
        (r"\bstring\b|\bfilename\b|\bpath\b", CanonicalType::String),
        (r"\brgb\b|\bcolor\b", CanonicalType::Color),
        (r"\bspectrum\b", CanonicalType::Spectrum),
        (r"\btransform\b", CanonicalType::Transform),
        (
            r"\b(bsdf|texture|emitter|shape|sensor|film|sampler|medium|phase|filter|spectrum|volume)\b",
            CanonicalType::Plugin,
        ),
    ]
    .into_iter()
    .map(|(pattern, ty)| (Regex::new(&format!("(?i){}", pattern)).unwrap(), ty))
    .collect()
});

/// Classify free-text type documentation. Never fails; unknown text is a
/// nested plugin.
pub fn infer_type(text: &str) -> CanonicalType {
    let text = text.trim();
    TYPE_RULES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, ty)| *ty)
        .unwrap_or(CanonicalType::Plugin)
}
