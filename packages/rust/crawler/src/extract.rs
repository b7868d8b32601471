//! Primary-content extraction from raw page HTML.
//!
//! Walks the parsed document body and re-serializes it without
//! navigational/boilerplate regions and non-text content. `data-*`
//! attributes are dropped and text is re-escaped so that entity decoding in
//! the cleaner sees exactly one level of encoding.

use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Html, Node, Selector};

/// Elements removed along with their whole subtree.
const EXCLUDED_TAGS: &[&str] = &[
    "form", "header", "footer", "script", "style", "noscript", "template", "svg", "iframe",
    "head",
];

/// Elements that never carry a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements after which a line break keeps neighbouring words apart.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Return the page's primary content as HTML with boilerplate removed.
pub fn extract_primary_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    let root = match Selector::parse("body") {
        Ok(sel) => doc.select(&sel).next().unwrap_or_else(|| doc.root_element()),
        Err(_) => doc.root_element(),
    };

    let mut out = String::with_capacity(html.len() / 2);
    write_children(root, &mut out);
    out
}

fn write_children(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&encode_text(&**text)),
            Node::Element(element) => {
                let name = element.name();
                if EXCLUDED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };

                out.push('<');
                out.push_str(name);
                for (attr, value) in element.attrs() {
                    if attr.starts_with("data-") {
                        continue;
                    }
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(&encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if !VOID_TAGS.contains(&name) {
                    write_children(child_el, out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }

                if BLOCK_TAGS.contains(&name) {
                    out.push('\n');
                }
            }
            // Comments, doctypes and processing instructions carry no page text.
            _ => {}
        }
    }
}
