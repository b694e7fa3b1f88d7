use crate::parsers::text;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

static BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Whitespace pattern should be valid"));

/// Tags whose text never reaches the reader
const HIDDEN_TAGS: [&str; 5] = ["script", "style", "noscript", "svg", "template"];

/// Tags that start a new paragraph in the text rendering
const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "li", "ul", "ol", "section", "article", "header", "footer", "h1", "h2", "h3",
    "h4", "tr", "table", "br",
];

/// Strips scripts, styles, comments and inline graphics, and collapses whitespace
pub fn clean_markup(html: &str) -> String {
    let mut doc = Html::parse_document(html);

    let noise: Vec<_> = doc
        .tree
        .nodes()
        .filter(|node| match node.value() {
            Node::Element(e) => HIDDEN_TAGS.contains(&e.name()),
            Node::Comment(_) => true,
            _ => false,
        })
        .map(|node| node.id())
        .collect();
    for id in noise {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }

    BLANKS.replace_all(doc.root_element().html().trim(), " ").into_owned()
}

/// Extracts the visible text of the document, one paragraph per block element
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(doc.root_element(), &mut raw);

    let options = text::TextOptions {
        preserve_paragraphs: true,
    };
    let result = text::normalize(&raw, &options);

    ::log::debug!("HTML text rendering produced {} bytes", result.len());
    result
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => {
                out.push_str(t);
                out.push(' ');
            }
            Node::Element(e) => {
                let name = e.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                let is_block = BLOCK_TAGS.contains(&name);
                if is_block {
                    out.push_str("\n\n");
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
                if is_block {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}
