//! DOM helpers used by the extraction strategies.

use scraper::{ElementRef, Html, Node, Selector};

use crate::text::collapse_whitespace;

const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Minimum scored text length for a paragraph cluster to count as the posting body.
const MIN_BLOCK_CHARS: usize = 200;

/// First element matching any selector in order, as single-line text.
pub fn first_text(page: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        page.select(&selector)
            .map(|el| collapse_whitespace(&visible_text(el, " ")))
            .find(|text| !text.is_empty())
    })
}

/// First element matching any selector in order, as multi-line text.
pub fn first_block(page: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        page.select(&selector)
            .map(block_text)
            .find(|text| !text.is_empty())
    })
}

/// `content` of the first `<meta>` whose `property` or `name` equals `key`.
pub fn meta_content(page: &Html, key: &str) -> Option<String> {
    let css = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
    let selector = Selector::parse(&css).ok()?;
    page.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

/// Text of one element, one trimmed text node per line, scripts and styles skipped.
pub fn block_text(element: ElementRef<'_>) -> String {
    visible_text(element, "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Joins the element's visible text nodes with `separator`.
pub fn visible_text(element: ElementRef<'_>, separator: &str) -> String {
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(el) => NON_CONTENT_TAGS.contains(&el.name()),
            _ => false,
        });
        let text = text.trim();
        if !hidden && !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join(separator)
}

/// The element holding the most paragraph text: for every element, the text of its
/// direct `p`/`li` children minus their link text. Navigation lists score low
/// because they are mostly links. Ties go to the earlier element.
pub fn largest_text_block(page: &Html) -> Option<String> {
    let all = Selector::parse("body, body *").ok()?;
    let links = Selector::parse("a").ok()?;
    let mut best: Option<(usize, ElementRef<'_>)> = None;

    for container in page.select(&all) {
        let score: usize = container
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| matches!(child.value().name(), "p" | "li"))
            .map(|child| {
                let text_len = visible_text(child, " ").chars().count();
                let link_len: usize = child
                    .select(&links)
                    .map(|a| visible_text(a, " ").chars().count())
                    .sum();
                text_len.saturating_sub(link_len)
            })
            .sum();

        if score > best.map_or(0, |(top, _)| top) {
            best = Some((score, container));
        }
    }

    let (score, element) = best?;
    (score >= MIN_BLOCK_CHARS).then(|| block_text(element))
}

/// Visible text of the whole `<body>`.
pub fn body_text(page: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    page.select(&selector)
        .next()
        .map(block_text)
        .filter(|text| !text.is_empty())
}

/// Whether the page carries a password field, the usual sign of a login wall.
pub fn has_login_form(page: &Html) -> bool {
    Selector::parse(r#"input[type="password"]"#)
        .map(|selector| page.select(&selector).next().is_some())
        .unwrap_or(false)
}

/// Converts an HTML fragment (e.g. a JSON-LD description) to plain text.
pub fn fragment_to_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    block_text(parsed.root_element())
}
