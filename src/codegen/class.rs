use std::collections::HashSet;
use std::fmt::Write;

use crate::parser::schema::{ParamSchema, PluginSchema};

/// Names the synthesized type already uses for its own members.
const RESERVED_MEMBERS: &[&str] = &[
    "id",
    "new",
    "plugin_type",
    "plugin_id",
    "set_plugin_id",
    "fields",
    "to_dict",
];

/// A parameter with its final member name.
struct Field<'a> {
    ident: String,
    param: &'a ParamSchema,
}

impl Field<'_> {
    fn rust_type(&self) -> &'static str {
        self.param.canonical_type.rust_type()
    }

    fn declared_type(&self) -> String {
        if self.param.required {
            self.rust_type().to_string()
        } else {
            format!("Option<{}>", self.rust_type())
        }
    }

    /// Expression producing this field's `Option<Value>`.
    fn value_expr(&self) -> String {
        let ident = &self.ident;
        let copy = self.param.canonical_type.is_copy();
        match (self.param.required, copy) {
            (true, true) => format!("Some(Value::from(self.{}))", ident),
            (true, false) => format!("Some(Value::from(self.{}.clone()))", ident),
            (false, true) => format!("self.{}.map(Value::from)", ident),
            (false, false) => format!("self.{}.clone().map(Value::from)", ident),
        }
    }
}

/// Rename members that clash with reserved names: `id` becomes `id_2`, or
/// `id_3` when `id_2` is taken. Wire keys are left alone.
fn resolve_fields(schema: &PluginSchema) -> Vec<Field<'_>> {
    let mut used: HashSet<String> = schema.params.iter().map(|p| p.identifier.clone()).collect();
    used.extend(RESERVED_MEMBERS.iter().map(|s| s.to_string()));

    schema
        .params
        .iter()
        .map(|param| {
            let mut ident = param.identifier.clone();
            if RESERVED_MEMBERS.contains(&ident.as_str()) {
                let mut n = 2;
                while used.contains(&format!("{}_{}", param.identifier, n)) {
                    n += 1;
                }
                ident = format!("{}_{}", param.identifier, n);
                used.insert(ident.clone());
            }
            Field { ident, param }
        })
        .collect()
}

/// Collapse whitespace so text fits on one doc line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn doc_block(out: &mut String, schema: &PluginSchema) {
    let title = if schema.title.is_empty() {
        &schema.slug
    } else {
        &schema.title
    };
    let _ = writeln!(out, "/// {}", one_line(title));
    let _ = writeln!(out, "///");
    let _ = writeln!(out, "/// Plugin type `{}`.", one_line(&schema.slug));
    let _ = writeln!(out, "/// <{}>", schema.source_url);
    let _ = writeln!(out, "///");
    let _ = writeln!(out, "/// ```text");
    if schema.params.is_empty() {
        let _ = writeln!(out, "/// (no parameters documented)");
    }
    for p in &schema.params {
        let markers: Vec<&str> = p.markers.iter().map(|m| m.symbol()).collect();
        let markers = if markers.is_empty() {
            String::new()
        } else {
            format!(" [{}]", markers.join(" | "))
        };
        let required = if p.required { " required." } else { "" };
        // to_dict owns these keys
        let unwritten = if p.key == "type" || p.key == "id" {
            " (not serialized: reserved key)"
        } else {
            ""
        };
        let line = format!(
            "- {} ({}){}:{} {}{}",
            one_line(&p.name),
            one_line(&p.type_text),
            markers,
            required,
            one_line(&p.description),
            unwritten
        );
        let _ = writeln!(out, "/// {}", line.trim_end().replace("```", "'''"));
    }
    let _ = writeln!(out, "/// ```");
}

/// Render one plugin type: struct, constructor, setters and `Plugin` impl.
pub fn render_class(schema: &PluginSchema, class_name: &str) -> String {
    let fields = resolve_fields(schema);
    let (required, optional): (Vec<&Field>, Vec<&Field>) =
        fields.iter().partition(|f| f.param.required);

    let mut out = String::new();
    doc_block(&mut out, schema);

    // struct
    let _ = writeln!(out, "#[derive(Debug, Clone)]");
    let _ = writeln!(out, "pub struct {} {{", class_name);
    for f in &required {
        let _ = writeln!(out, "    pub {}: {},", f.ident, f.declared_type());
    }
    let _ = writeln!(out, "    pub id: Option<String>,");
    for f in &optional {
        let _ = writeln!(out, "    pub {}: {},", f.ident, f.declared_type());
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    // constructor and setters
    let _ = writeln!(out, "impl {} {{", class_name);
    let args: Vec<String> = required
        .iter()
        .map(|f| format!("{}: impl Into<{}>", f.ident, f.rust_type()))
        .collect();
    let _ = writeln!(out, "    pub fn new({}) -> Self {{", args.join(", "));
    let _ = writeln!(out, "        Self {{");
    for f in &required {
        let _ = writeln!(out, "            {}: {}.into(),", f.ident, f.ident);
    }
    let _ = writeln!(out, "            id: None,");
    for f in &optional {
        let _ = writeln!(out, "            {}: None,", f.ident);
    }
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub fn id(mut self, id: impl Into<String>) -> Self {{");
    let _ = writeln!(out, "        self.id = Some(id.into());");
    let _ = writeln!(out, "        self");
    let _ = writeln!(out, "    }}");
    for f in &optional {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "    pub fn {}(mut self, value: impl Into<{}>) -> Self {{",
            f.ident,
            f.rust_type()
        );
        let _ = writeln!(out, "        self.{} = Some(value.into());", f.ident);
        let _ = writeln!(out, "        self");
        let _ = writeln!(out, "    }}");
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    if required.is_empty() {
        let _ = writeln!(out, "impl Default for {} {{", class_name);
        let _ = writeln!(out, "    fn default() -> Self {{");
        let _ = writeln!(out, "        Self::new()");
        let _ = writeln!(out, "    }}");
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
    }

    // Plugin impl
    let _ = writeln!(out, "impl Plugin for {} {{", class_name);
    let _ = writeln!(out, "    fn plugin_type(&self) -> &str {{");
    let _ = writeln!(out, "        {:?}", schema.slug);
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    fn plugin_id(&self) -> Option<&str> {{");
    let _ = writeln!(out, "        self.id.as_deref()");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    fn set_plugin_id(&mut self, id: String) {{");
    let _ = writeln!(out, "        self.id = Some(id);");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    fn fields(&self) -> Vec<(&'static str, Option<Value>)> {{");
    if fields.is_empty() {
        let _ = writeln!(out, "        Vec::new()");
    } else {
        let _ = writeln!(out, "        vec![");
        for f in required.iter().chain(optional.iter()) {
            let _ = writeln!(out, "            ({:?}, {}),", f.param.key, f.value_expr());
        }
        let _ = writeln!(out, "        ]");
    }
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::Marker;
    use crate::parser::types::CanonicalType;

    fn param(ident: &str, ty: CanonicalType, required: bool) -> ParamSchema {
        ParamSchema {
            identifier: ident.into(),
            key: ident.trim_end_matches('_').into(),
            name: ident.into(),
            type_text: format!("{:?}", ty).to_lowercase(),
            canonical_type: ty,
            required,
            description: format!("The {} parameter.", ident),
            markers: vec![],
        }
    }

    fn schema(params: Vec<ParamSchema>) -> PluginSchema {
        PluginSchema {
            class_name: "Measured".into(),
            title: "Measured material".into(),
            slug: "measured".into(),
            source_url: "https://example.org/plugins_bsdfs.html#measured".into(),
            params,
        }
    }

    #[test]
    fn required_args_then_id_then_optional_fields() {
        let s = schema(vec![
            param("filename", CanonicalType::String, true),
            param("use_grid", CanonicalType::Bool, false),
            param("type_", CanonicalType::String, false),
        ]);
        let src = render_class(&s, "Measured");

        assert!(src.contains("pub fn new(filename: impl Into<String>) -> Self {"));
        let filename = src.find("pub filename: String,").unwrap();
        let id = src.find("pub id: Option<String>,").unwrap();
        let grid = src.find("pub use_grid: Option<bool>,").unwrap();
        assert!(filename < id && id < grid);
        assert!(src.contains("pub fn use_grid(mut self, value: impl Into<bool>) -> Self {"));
        assert!(src.contains("(\"filename\", Some(Value::from(self.filename.clone()))),"));
        assert!(src.contains("(\"use_grid\", self.use_grid.map(Value::from)),"));
        assert!(src.contains("(\"type\", self.type_.clone().map(Value::from)),"));
        assert!(!src.contains("impl Default for Measured"));
    }

    #[test]
    fn default_only_without_required_params() {
        let s = schema(vec![param("radius", CanonicalType::Float, false)]);
        let src = render_class(&s, "Sphere");
        assert!(src.contains("impl Default for Sphere {"));
        assert!(src.contains("pub fn new() -> Self {"));
    }

    #[test]
    fn slug_is_plugin_type() {
        let src = render_class(&schema(vec![]), "Measured");
        assert!(src.contains("    fn plugin_type(&self) -> &str {\n        \"measured\"\n    }"));
        assert!(src.contains("        Vec::new()\n"));
        assert!(src.contains("/// (no parameters documented)"));
    }

    #[test]
    fn reserved_members_get_suffix() {
        let s = schema(vec![
            param("id", CanonicalType::String, false),
            param("id_2", CanonicalType::String, false),
            param("fields", CanonicalType::Int, false),
        ]);
        let src = render_class(&s, "Measured");
        assert!(src.contains("pub id_3: Option<String>,"));
        assert!(src.contains("pub id_2: Option<String>,"));
        assert!(src.contains("pub fields_2: Option<i64>,"));
        assert!(src.contains("(\"id\", self.id_3.clone().map(Value::from)),"));
        assert!(src.contains("(\"fields\", self.fields_2.map(Value::from)),"));
    }

    #[test]
    fn doc_lists_params_with_markers() {
        let mut p = param("to_world", CanonicalType::Transform, false);
        p.type_text = "transform".into();
        p.description = "Object-to-world\n   transformation ```x```".into();
        p.markers = vec![Marker::Exposed, Marker::Differentiable, Marker::Discontinuous];
        let src = render_class(&schema(vec![p]), "Measured");
        assert!(src.starts_with("/// Measured material\n"));
        assert!(src.contains("/// Plugin type `measured`."));
        assert!(src.contains(
            "/// - to_world (transform) [P | ∂ | D]: Object-to-world transformation '''x'''\n"
        ));
    }

    #[test]
    fn doc_flags_fields_shadowed_by_reserved_keys() {
        let s = schema(vec![
            param("type_", CanonicalType::String, false),
            param("use_grid", CanonicalType::Bool, false),
        ]);
        let src = render_class(&s, "Measured");
        assert!(src.contains(
            "/// - type_ (string): The type_ parameter. (not serialized: reserved key)\n"
        ));
        assert!(src.contains("/// - use_grid (bool): The use_grid parameter.\n"));
    }

    #[test]
    fn deterministic() {
        let s = schema(vec![
            param("filename", CanonicalType::String, true),
            param("reflectance", CanonicalType::Spectrum, false),
        ]);
        assert_eq!(render_class(&s, "Measured"), render_class(&s, "Measured"));
    }
}
