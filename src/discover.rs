use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::html::Element;

static CATEGORY_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/src/)?generated/plugins_[^/]+\.html$|plugins_[^/]+\.html$").unwrap()
});

const CATEGORY_PREFIX: &str = "plugins_";

/// Find plugin category pages linked from the overview document.
///
/// Returns display name → absolute page URL. A name linked twice keeps the
/// last href seen.
pub fn discover_categories(overview_url: &Url, document: &Element) -> BTreeMap<String, Url> {
    let mut categories = BTreeMap::new();

    for a in document.find_all(|e| e.is("a")) {
        let Some(href) = a.attr("href") else {
            continue;
        };
        if !CATEGORY_HREF_RE.is_match(href) {
            continue;
        }
        let url = match overview_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping unresolvable category href {}: {}", href, e);
                continue;
            }
        };
        categories.insert(category_name(href), url);
    }

    info!("Discovered {} plugin categories", categories.len());
    categories
}

/// `generated/plugins_phase_functions.html` → `Phase Functions`.
pub fn category_name(href: &str) -> String {
    let file = href.rsplit('/').next().unwrap_or(href);
    let stem = file.strip_suffix(".html").unwrap_or(file);
    let stem = stem.replacen(CATEGORY_PREFIX, "", 1);
    title_case(&stem.replace('_', " "))
}

/// Uppercase the first letter of every word, lowercase the rest. A "word"
/// starts after any non-alphabetic character.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}
