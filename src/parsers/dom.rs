use scraper::{ElementRef, Selector};
use std::collections::HashSet;

/// Elements whose boundaries separate words in rendered text
const SPACED_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul",
];

/// Compiles a selector that is known at build time
pub fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {selector:?}: {e}"))
}

/// Collects an element's text, collapsing runs of whitespace to single spaces.
///
/// Block elements and `<br>` separate the text on either side of them, so
/// `<div>a</div><div>b</div>` reads as `a b` while `a<b>b</b>` stays `ab`.
pub fn text_of(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    push_text(element, &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let spaced = SPACED_ELEMENTS.contains(&child.value().name());
            if spaced {
                out.push(' ');
            }
            push_text(child, out);
            if spaced {
                out.push(' ');
            }
        }
    }
}

/// Selects every match of `selector` inside any of `scopes`.
///
/// Results keep document order per scope; an element reachable from two
/// overlapping scopes is returned once.
pub fn select_within<'a>(scopes: &[ElementRef<'a>], selector: &Selector) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for scope in scopes {
        for element in scope.select(selector) {
            if seen.insert(element.id()) {
                found.push(element);
            }
        }
    }

    found
}

/// Returns the element sibling `offset` positions after `anchor`.
///
/// Offset 0 is the anchor itself. Text and comment nodes between elements
/// are not counted. `None` when the anchor has fewer following siblings.
pub fn sibling_at<'a>(anchor: ElementRef<'a>, offset: usize) -> Option<ElementRef<'a>> {
    if offset == 0 {
        return Some(anchor);
    }

    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .nth(offset - 1)
}

/// Returns the direct element children of `element`
pub fn child_elements<'a>(element: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap).collect()
}
