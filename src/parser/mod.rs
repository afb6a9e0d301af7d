pub mod schema;
pub mod tables;
pub mod types;

use crate::html::Element;
use schema::PluginSchema;

/// Two-pass pipeline: document → plugin sections → schemas.
pub fn process_page(category: &str, category_url: &str, document: &Element) -> Vec<PluginSchema> {
    tables::extract_sections(category_url, document)
        .iter()
        .map(|section| schema::build_schema(section, category))
        .collect()
}

// ── Tests ──
