use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::html::Element;

static PAREN_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

/// One row of a plugin parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamRow {
    /// Aliases from a comma-joined name cell, in written order.
    pub names: Vec<String>,
    pub type_text: String,
    pub description: String,
    pub flags: String,
}

/// A documented plugin: one heading plus its parameter table.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSection {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub params: Vec<ParamRow>,
}

struct Columns {
    name: usize,
    ty: usize,
    description: usize,
    flags: Option<usize>,
}

/// Extract every plugin section of a category page, in document order.
/// Sections without a parameter/type table are skipped.
pub fn extract_sections(category_url: &str, document: &Element) -> Vec<PluginSection> {
    document
        .find_all(is_section)
        .into_iter()
        .filter_map(|section| extract_section(category_url, section))
        .collect()
}

fn is_section(e: &Element) -> bool {
    e.is("section") || (e.is("div") && e.has_class("section"))
}

/// Elements belonging to `section` itself, not to a nested section.
fn own_elements<'a>(section: &'a Element, pred: impl Fn(&Element) -> bool) -> Vec<&'a Element> {
    section.find_all_within(pred, |e| !is_section(e))
}

fn extract_section(category_url: &str, section: &Element) -> Option<PluginSection> {
    let heading = own_elements(section, |e| e.is("h2") || e.is("h3"))
        .into_iter()
        .next()?;

    let tables: Vec<&Element> = own_elements(section, |e| e.is("table"))
        .into_iter()
        .filter(|t| is_param_table(t))
        .collect();
    if tables.is_empty() {
        return None;
    }

    let heading_text = heading_text(heading);
    let slug = resolve_slug(heading, section, &heading_text);
    let title = heading_text
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    let anchor = heading.id().unwrap_or(&slug);
    let url = format!("{}#{}", category_url, anchor);

    let params = tables
        .iter()
        .map(|t| extract_rows(t))
        .find(|rows| !rows.is_empty())
        .unwrap_or_default();

    Some(PluginSection {
        title,
        slug,
        url,
        params,
    })
}

/// Heading text without Sphinx permalink anchors.
fn heading_text(heading: &Element) -> String {
    heading
        .text_excluding(|e| e.is("a") && e.has_class("headerlink"))
        .trim_end_matches('¶')
        .trim()
        .to_string()
}

/// Slug resolution, first hit wins: `Title (slug)`, inline code in the
/// heading, heading id, section id, first heading word.
fn resolve_slug(heading: &Element, section: &Element, heading_text: &str) -> String {
    if let Some(slug) = PAREN_SLUG_RE
        .captures(heading_text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return slug;
    }

    if let Some(slug) = heading
        .find(|e| e.is("code"))
        .map(|code| code.text().trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return slug;
    }

    heading
        .id()
        .or_else(|| section.id())
        .or_else(|| heading_text.split_whitespace().next())
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn header_labels(table: &Element) -> Vec<String> {
    table
        .find_all(|e| e.is("th"))
        .into_iter()
        .map(|th| th.text().to_lowercase())
        .collect()
}

fn is_param_table(table: &Element) -> bool {
    let heads = header_labels(table);
    if heads.is_empty() {
        return false;
    }
    let joined = heads.join(" ");
    joined.contains("parameter") && joined.contains("type")
}

fn column(heads: &[String], labels: &[&str]) -> Option<usize> {
    heads
        .iter()
        .position(|h| labels.iter().any(|label| h.contains(label)))
}

fn resolve_columns(heads: &[String]) -> Columns {
    Columns {
        name: column(heads, &["parameter"]).unwrap_or(0),
        ty: column(heads, &["type"]).unwrap_or(1),
        description: column(heads, &["description", "desc"]).unwrap_or(2),
        flags: column(heads, &["flags"]),
    }
}

fn extract_rows(table: &Element) -> Vec<ParamRow> {
    let columns = resolve_columns(&header_labels(table));
    let mut rows = Vec::new();

    for tr in table.find_all(|e| e.is("tr")) {
        let cells: Vec<String> = tr
            .elements()
            .filter(|c| c.is("td"))
            .map(|td| td.text())
            .collect();
        if cells.is_empty() {
            continue;
        }
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();

        rows.push(ParamRow {
            names: split_names(&cell(columns.name)),
            type_text: cell(columns.ty),
            description: cell(columns.description),
            flags: columns.flags.map(cell).unwrap_or_default(),
        });
    }

    rows
}

/// `"a, b"` → `["a", "b"]`. A cell with no usable alias keeps its raw text.
pub fn split_names(cell: &str) -> Vec<String> {
    let parts: Vec<String> = cell
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if parts.is_empty() {
        vec![cell.to_string()]
    } else {
        parts
    }
}

// ── Tests ──
