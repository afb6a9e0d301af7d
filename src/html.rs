use std::sync::LazyLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::debug;

static RAW_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});
static STRAY_LT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^A-Za-z/!?])").unwrap());

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose start tag implicitly closes an open sibling of the same family.
const SELF_CLOSING_SIBLINGS: &[&[&str]] = &[&["li"], &["p"], &["tr"], &["td", "th"], &["option"]];

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The element's `id`, if present and non-blank.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// All descendant elements matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&pred, &|_: &Element| true, &mut out);
        out
    }

    /// Like [`find_all`](Self::find_all), but does not descend into elements
    /// for which `enter` returns false.
    pub fn find_all_within(
        &self,
        pred: impl Fn(&Element) -> bool,
        enter: impl Fn(&Element) -> bool,
    ) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&pred, &enter, &mut out);
        out
    }

    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.find_all(pred).into_iter().next()
    }

    fn walk<'a>(
        &'a self,
        pred: &dyn Fn(&Element) -> bool,
        enter: &dyn Fn(&Element) -> bool,
        out: &mut Vec<&'a Element>,
    ) {
        for child in self.elements() {
            if pred(child) {
                out.push(child);
            }
            if enter(child) {
                child.walk(pred, enter, out);
            }
        }
    }

    /// Text content: every text node trimmed, blanks dropped, joined with a space.
    pub fn text(&self) -> String {
        self.text_excluding(|_| false)
    }

    /// Text content, skipping subtrees rooted at elements matching `skip`.
    pub fn text_excluding(&self, skip: impl Fn(&Element) -> bool) -> String {
        let mut parts = Vec::new();
        self.collect_text(&skip, &mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, skip: &dyn Fn(&Element) -> bool, parts: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                Node::Text(t) => {
                    let t = t.trim();
                    if !t.is_empty() {
                        parts.push(t);
                    }
                }
                Node::Element(e) if !skip(e) => e.collect_text(skip, parts),
                Node::Element(_) => {}
            }
        }
    }
}

/// Parse an HTML page into an element tree rooted at a synthetic `#document`.
///
/// Tolerant by construction: unmatched end tags are ignored, unclosed
/// elements are closed at end of input, and a reader error keeps whatever was
/// parsed up to that point.
pub fn parse(html: &str) -> Element {
    let cleaned = RAW_TEXT_RE.replace_all(html, "");
    let cleaned = STRAY_LT_RE.replace_all(&cleaned, "&lt;$1");

    let mut reader = Reader::from_str(&cleaned);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack: Vec<Element> = vec![Element::new("#document")];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let el = open_element(&e);
                close_implied_sibling(&mut stack, &el.name);
                if VOID_ELEMENTS.contains(&el.name.as_str()) {
                    attach(&mut stack, Node::Element(el));
                } else {
                    stack.push(el);
                }
            }
            Ok(Event::Empty(e)) => {
                let el = open_element(&e);
                attach(&mut stack, Node::Element(el));
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                close(&mut stack, &name);
            }
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(&e);
                attach(&mut stack, Node::Text(decode_entities(&raw)));
            }
            Ok(Event::CData(e)) => {
                attach(&mut stack, Node::Text(String::from_utf8_lossy(&e).into_owned()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(
                    "HTML reader stopped at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    while stack.len() > 1 {
        if let Some(el) = stack.pop() {
            attach(&mut stack, Node::Element(el));
        }
    }
    stack.pop().unwrap_or_else(|| Element::new("#document"))
}

/// Decode HTML5 named and numeric character references. Text with a broken
/// reference (a bare `&` in prose) is kept verbatim.
pub fn decode_entities(raw: &str) -> String {
    match unescape_with(raw, resolve_html5_entity) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn open_element(e: &BytesStart) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let attrs = e
        .html_attributes()
        .filter_map(Result::ok)
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_ascii_lowercase();
            let value = decode_entities(&String::from_utf8_lossy(&a.value));
            (key, value)
        })
        .collect();
    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

fn attach(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

/// Pop up to and including the innermost open element named `name`.
fn close(stack: &mut Vec<Element>, name: &str) {
    let Some(pos) = stack.iter().skip(1).rposition(|el| el.name == name) else {
        return;
    };
    let pos = pos + 1;
    while stack.len() > pos {
        if let Some(el) = stack.pop() {
            attach(stack, Node::Element(el));
        }
    }
}

fn close_implied_sibling(stack: &mut Vec<Element>, name: &str) {
    let Some(family) = SELF_CLOSING_SIBLINGS.iter().find(|f| f.contains(&name)) else {
        return;
    };
    let top_in_family = stack
        .last()
        .is_some_and(|top| stack.len() > 1 && family.contains(&top.name.as_str()));
    if top_in_family {
        if let Some(el) = stack.pop() {
            attach(stack, Node::Element(el));
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_text() {
        let doc = parse("<div><p>Hello <b>big</b> world</p></div>");
        let p = doc.find(|e| e.is("p")).unwrap();
        assert_eq!(p.text(), "Hello big world");
    }

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let doc = parse("<head><meta charset=\"utf-8\"><link rel=x></head><body><p>a</p></body>");
        let body = doc.find(|e| e.is("body")).unwrap();
        assert_eq!(body.text(), "a");
        let head = doc.find(|e| e.is("head")).unwrap();
        assert_eq!(head.elements().count(), 2);
    }

    #[test]
    fn unmatched_end_tag_ignored() {
        let doc = parse("<section id=\"s\"><h2>Title</h2></span><p>x</p></section>");
        let section = doc.find(|e| e.is("section")).unwrap();
        assert_eq!(section.id(), Some("s"));
        assert_eq!(section.elements().count(), 2);
    }

    #[test]
    fn unclosed_elements_closed_at_eof() {
        let doc = parse("<div><ul><li>one<li>two");
        let items = doc.find_all(|e| e.is("li"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text(), "two");
    }

    #[test]
    fn entities_decoded() {
        let doc = parse("<p>R&amp;D &nbsp;&#8217;s &lt;tag&gt;</p>");
        let text = doc.find(|e| e.is("p")).unwrap().text();
        assert!(text.starts_with("R&D"));
        assert!(text.contains('\u{2019}'));
        assert!(text.ends_with("<tag>"));
    }

    #[test]
    fn bare_ampersand_kept() {
        assert_eq!(decode_entities("salt & pepper"), "salt & pepper");
    }

    #[test]
    fn scripts_dropped() {
        let doc = parse("<body><script>if (a < b && c) {}</script><p>kept</p></body>");
        assert_eq!(doc.text(), "kept");
    }

    #[test]
    fn stray_less_than_in_text() {
        let doc = parse("<p>x < 3 and y</p><p>next</p>");
        assert_eq!(doc.find_all(|e| e.is("p")).len(), 2);
    }

    #[test]
    fn class_and_attribute_lookup() {
        let doc = parse("<div class=\"section  highlight\" data-x=1><a href='a.html'>a</a></div>");
        let div = doc.find(|e| e.is("div")).unwrap();
        assert!(div.has_class("section"));
        assert!(!div.has_class("sect"));
        assert_eq!(div.attr("data-x"), Some("1"));
        assert_eq!(doc.find(|e| e.is("a")).unwrap().attr("href"), Some("a.html"));
    }

    #[test]
    fn find_all_within_stops_at_boundary() {
        let doc = parse("<section><h2>A</h2><section><h2>B</h2></section></section>");
        let outer = doc.find(|e| e.is("section")).unwrap();
        let own = outer.find_all_within(|e| e.is("h2"), |e| !e.is("section"));
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].text(), "A");
    }

    #[test]
    fn text_excluding_headerlink() {
        let doc = parse("<h2>Sphere (sphere)<a class=\"headerlink\" href=\"#x\">¶</a></h2>");
        let h = doc.find(|e| e.is("h2")).unwrap();
        assert_eq!(h.text_excluding(|e| e.has_class("headerlink")), "Sphere (sphere)");
    }
}
