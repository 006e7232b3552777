//! Visible-text extraction from fetched HTML.
//!
//! Walks the parsed node tree in document order and collects text whose
//! parent element can render it. Comments and doctype nodes are not text
//! nodes, so they fall out of the walk naturally.

use scraper::Html;

/// Element names whose direct text content is never visible prose.
const HIDDEN_PARENTS: [&str; 5] = ["style", "script", "head", "title", "meta"];

/// Extract the visible text of a page, fragments joined by single spaces.
///
/// A text node is kept when its parent is an element outside
/// [`HIDDEN_PARENTS`]; text hanging directly off the document root is
/// dropped. Whitespace-only fragments are skipped.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut fragments: Vec<&str> = Vec::new();
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let visible = match node.parent() {
            Some(parent) => match parent.value().as_element() {
                Some(el) => !HIDDEN_PARENTS.contains(&el.name()),
                None => false,
            },
            None => false,
        };
        if !visible {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            fragments.push(trimmed);
        }
    }

    fragments.join(" ")
}
