use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::tables::PluginSection;
use super::types::{infer_type, CanonicalType};

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());
static EXPOSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bP\b").unwrap());
static DIFFERENTIABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"∂|\\partial").unwrap());
static DISCONTINUOUS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bD\b").unwrap());

/// Flags marking renderer-computed parameters that authors cannot set.
const EXCLUDED_FLAGS: &[&str] = &["state", "derived", "output"];
const REQUIRED_FLAG: &str = "required";

pub const FALLBACK_CLASS_NAME: &str = "PluginClass";
const FALLBACK_PARAM: &str = "param";
const SHAPE_BSDF_DESCRIPTION: &str = "surface scattering model";

/// Strict and reserved keywords of the 2021 and 2024 editions.
pub const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Documented parameter annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Marker {
    /// `P`: exposed to the renderer's parameter traversal.
    Exposed,
    /// `∂`: differentiable.
    Differentiable,
    /// `D`: differentiable with discontinuities.
    Discontinuous,
}

impl Marker {
    pub fn symbol(self) -> &'static str {
        match self {
            Marker::Exposed => "P",
            Marker::Differentiable => "∂",
            Marker::Discontinuous => "D",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSchema {
    /// Field name in synthesized code.
    pub identifier: String,
    /// Key written into the scene mapping.
    pub key: String,
    /// Alias as documented.
    pub name: String,
    pub type_text: String,
    pub canonical_type: CanonicalType,
    pub required: bool,
    pub description: String,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginSchema {
    pub class_name: String,
    pub title: String,
    pub slug: String,
    pub source_url: String,
    /// Required parameters first, then optional, each in documented order.
    pub params: Vec<ParamSchema>,
}

/// Build the schema of one documented plugin. Infallible: a section without
/// usable rows yields an empty parameter list.
pub fn build_schema(section: &PluginSection, category: &str) -> PluginSchema {
    let mut seen: HashSet<String> = HashSet::new();
    let mut required = Vec::new();
    let mut optional = Vec::new();

    for row in &section.params {
        let flags = row.flags.to_lowercase();
        if EXCLUDED_FLAGS.iter().any(|f| flags.contains(f)) {
            debug!("{}: skipping computed parameter {:?}", section.slug, row.names);
            continue;
        }
        let is_required = flags.contains(REQUIRED_FLAG);
        let canonical_type = infer_type(&row.type_text);
        let markers = parse_markers(&row.flags);

        for name in &row.names {
            let key = normalize_key(name);
            let identifier = to_identifier(&key);
            if !seen.insert(identifier.clone()) {
                debug!("{}: dropping duplicate parameter {:?}", section.slug, name);
                continue;
            }
            let param = ParamSchema {
                identifier,
                key,
                name: name.clone(),
                type_text: row.type_text.clone(),
                canonical_type,
                required: is_required,
                description: row.description.clone(),
                markers: markers.clone(),
            };
            if is_required {
                required.push(param);
            } else {
                optional.push(param);
            }
        }
    }

    let mut params = required;
    params.extend(optional);

    if is_shape_category(category) && !seen.contains("bsdf") {
        params.push(ParamSchema {
            identifier: "bsdf".into(),
            key: "bsdf".into(),
            name: "bsdf".into(),
            type_text: "bsdf".into(),
            canonical_type: CanonicalType::Plugin,
            required: false,
            description: SHAPE_BSDF_DESCRIPTION.into(),
            markers: vec![Marker::Exposed],
        });
    }

    let base = if section.title.is_empty() {
        &section.slug
    } else {
        &section.title
    };

    PluginSchema {
        class_name: class_name(base),
        title: section.title.clone(),
        slug: section.slug.clone(),
        source_url: section.url.clone(),
        params,
    }
}

fn is_shape_category(category: &str) -> bool {
    category.to_lowercase().starts_with("shape")
}

fn parse_markers(flags: &str) -> Vec<Marker> {
    [
        (&*EXPOSED_RE, Marker::Exposed),
        (&*DIFFERENTIABLE_RE, Marker::Differentiable),
        (&*DISCONTINUOUS_RE, Marker::Discontinuous),
    ]
    .into_iter()
    .filter(|(re, _)| re.is_match(flags))
    .map(|(_, marker)| marker)
    .collect()
}

/// `"Spectrum-Value"` → `"spectrum_value"`. Never empty.
pub fn normalize_key(name: &str) -> String {
    let replaced = NON_WORD_RE.replace_all(name, "_").to_lowercase();
    let key = replaced.trim_matches('_');
    if key.is_empty() {
        FALLBACK_PARAM.to_string()
    } else {
        key.to_string()
    }
}

/// Make a normalized key usable as a Rust identifier.
pub fn to_identifier(key: &str) -> String {
    let mut ident = if key.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", key)
    } else {
        key.to_string()
    };
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// `"Smooth diffuse material"` → `"SmoothDiffuseMaterial"`.
pub fn class_name(title: &str) -> String {
    let titled = crate::discover::title_case(title);
    let name: String = titled.chars().filter(char::is_ascii_alphanumeric).collect();
    if name.is_empty() {
        FALLBACK_CLASS_NAME.to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Plugin{}", name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tables::{ParamRow, PluginSection};

    fn row(names: &[&str], ty: &str, flags: &str) -> ParamRow {
        ParamRow {
            names: names.iter().map(|n| n.to_string()).collect(),
            type_text: ty.into(),
            description: format!("{} parameter", names.join("/")),
            flags: flags.into(),
        }
    }

    fn section(title: &str, params: Vec<ParamRow>) -> PluginSection {
        PluginSection {
            title: title.into(),
            slug: "slug".into(),
            url: "https://example.org/plugins.html#slug".into(),
            params,
        }
    }

    fn identifiers(schema: &PluginSchema) -> Vec<&str> {
        schema.params.iter().map(|p| p.identifier.as_str()).collect()
    }

    #[test]
    fn required_before_optional_in_encounter_order() {
        let s = section(
            "Test",
            vec![
                row(&["a"], "float", ""),
                row(&["b"], "float", "required"),
                row(&["c"], "int", ""),
                row(&["d"], "string", "Required"),
            ],
        );
        let schema = build_schema(&s, "Bsdfs");
        assert_eq!(identifiers(&schema), vec!["b", "d", "a", "c"]);
        assert!(schema.params[0].required && schema.params[1].required);
        assert!(!schema.params[2].required && !schema.params[3].required);
    }

    #[test]
    fn computed_params_dropped() {
        let s = section(
            "Test",
            vec![
                row(&["eta"], "float", "state, P"),
                row(&["weight"], "float", "derived"),
                row(&["result"], "float", "Output"),
                row(&["kept"], "float", "P"),
            ],
        );
        let schema = build_schema(&s, "Bsdfs");
        assert_eq!(identifiers(&schema), vec!["kept"]);
    }

    #[test]
    fn aliases_split_and_first_wins() {
        let s = section(
            "Test",
            vec![
                row(&["use_grid"], "boolean", ""),
                row(&["specular_reflectance", "specular_transmittance"], "spectrum", ""),
                row(&["use-grid"], "integer", ""),
            ],
        );
        let schema = build_schema(&s, "Bsdfs");
        assert_eq!(
            identifiers(&schema),
            vec!["use_grid", "specular_reflectance", "specular_transmittance"]
        );
        assert_eq!(schema.params[0].canonical_type, CanonicalType::Bool);
        assert_eq!(schema.params[2].canonical_type, CanonicalType::Spectrum);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_key("To World"), "to_world");
        assert_eq!(normalize_key("(Nested plugin)"), "nested_plugin");
        assert_eq!(normalize_key("__x__"), "x");
        assert_eq!(normalize_key(""), "param");
        assert_eq!(normalize_key("---"), "param");
        assert_eq!(to_identifier("2d_grid"), "_2d_grid");
        assert_eq!(to_identifier("type"), "type_");
        assert_eq!(to_identifier("ref"), "ref_");
        assert_eq!(to_identifier("radius"), "radius");
    }

    #[test]
    fn reserved_keywords_escaped() {
        assert_eq!(to_identifier("do"), "do_");
        assert_eq!(to_identifier("abstract"), "abstract_");
        assert_eq!(to_identifier("become"), "become_");
        assert_eq!(to_identifier("gen"), "gen_");
        assert_eq!(to_identifier("done"), "done");

        let schema = build_schema(&section("Test", vec![row(&["do"], "boolean", "")]), "Bsdfs");
        assert_eq!(schema.params[0].identifier, "do_");
        assert_eq!(schema.params[0].key, "do");
    }

    #[test]
    fn keyword_keeps_wire_key() {
        let schema = build_schema(&section("Test", vec![row(&["type"], "string", "")]), "Bsdfs");
        assert_eq!(schema.params[0].identifier, "type_");
        assert_eq!(schema.params[0].key, "type");
        assert_eq!(schema.params[0].name, "type");
    }

    #[test]
    fn shapes_get_bsdf() {
        let s = section("Sphere", vec![row(&["radius"], "float", "")]);
        let schema = build_schema(&s, "Shapes");
        let last = schema.params.last().unwrap();
        assert_eq!(last.identifier, "bsdf");
        assert_eq!(last.canonical_type, CanonicalType::Plugin);
        assert!(!last.required);
        assert_eq!(last.description, "surface scattering model");

        let other = build_schema(&s, "Emitters");
        assert!(other.params.iter().all(|p| p.identifier != "bsdf"));
    }

    #[test]
    fn documented_bsdf_not_duplicated() {
        let s = section(
            "Rectangle",
            vec![row(&["bsdf"], "bsdf", ""), row(&["to_world"], "transform", "")],
        );
        let schema = build_schema(&s, "shapes");
        assert_eq!(identifiers(&schema), vec!["bsdf", "to_world"]);
    }

    #[test]
    fn markers_from_plain_and_tex_flags() {
        assert_eq!(
            parse_markers(r"\(\texttt{P}\), \(\partial\), \(\mathcal{D}\)"),
            vec![Marker::Exposed, Marker::Differentiable, Marker::Discontinuous]
        );
        assert_eq!(parse_markers("P, ∂"), vec![Marker::Exposed, Marker::Differentiable]);
        assert!(parse_markers("required").is_empty());
        assert!(parse_markers("").is_empty());
    }

    #[test]
    fn class_names() {
        assert_eq!(class_name("Smooth diffuse material"), "SmoothDiffuseMaterial");
        assert_eq!(class_name("Rough plastic (roughplastic)"), "RoughPlasticRoughplastic");
        assert_eq!(class_name("BSDF"), "Bsdf");
        assert_eq!(class_name("2D grid"), "Plugin2DGrid");
        assert_eq!(class_name(""), FALLBACK_CLASS_NAME);
        assert_eq!(class_name("¶"), FALLBACK_CLASS_NAME);
    }

    #[test]
    fn class_name_falls_back_to_slug() {
        let mut s = section("", vec![]);
        s.slug = "thindielectric".into();
        assert_eq!(build_schema(&s, "Bsdfs").class_name, "Thindielectric");
    }

    #[test]
    fn empty_section_is_valid() {
        let schema = build_schema(&section("Null", vec![]), "Bsdfs");
        assert!(schema.params.is_empty());
        assert_eq!(schema.class_name, "Null");
    }

    #[test]
    fn required_row_has_no_default() {
        let schema = build_schema(&section("M", vec![row(&["filename"], "string", "required")]), "Bsdfs");
        assert!(schema.params[0].required);
        assert_eq!(schema.params[0].canonical_type, CanonicalType::String);
    }
}
