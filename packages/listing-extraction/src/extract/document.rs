//! Normalized view of fetched content.
//!
//! Markup is parsed with `scraper` and flattened to line-oriented text;
//! reader-proxy markdown is cleaned of link and image syntax. Either way the
//! extraction rules see one `text` string whose offsets are what candidates
//! and the scorer refer to, plus whatever structural hints survived.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::ops::Range;

use crate::types::fetch::{ContentFormat, FetchedContent};

lazy_static! {
    static ref STREET_ADDRESS_REGEX: Regex =
        Regex::new(r#""streetAddress"\s*:\s*"(?P<value>[^"]{3,200})""#).unwrap();
    static ref MD_IMAGE_REGEX: Regex = Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap();
    static ref MD_LINK_REGEX: Regex = Regex::new(r"\[(?P<text>[^\]]*)\]\([^)]*\)").unwrap();
    static ref MD_EMPHASIS_REGEX: Regex = Regex::new(r"\*\*|__").unwrap();
    static ref INLINE_SPACE_REGEX: Regex = Regex::new(r"[ \t\u{a0}\u{2009}\u{202f}]+").unwrap();
}

/// Elements whose text never carries listing content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "head",
];

/// Elements that start a new line in the flattened text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "td", "th", "table", "h1", "h2", "h3", "h4",
    "h5", "h6", "section", "article", "header", "footer", "nav", "aside", "main", "address",
    "dt", "dd", "dl", "title", "button", "figcaption",
];

/// Content prepared for the candidate generator.
#[derive(Debug, Clone)]
pub struct Document {
    /// Flattened text, one logical line per block element
    pub text: String,

    pub title: Option<String>,

    /// First top-level heading (`<h1>`, or `# ` in markdown)
    pub heading: Option<String>,

    pub meta_description: Option<String>,

    /// Address assembled from embedded structured data
    pub structured_address: Option<String>,

    /// Byte range of `text` holding the title line
    pub title_span: Option<Range<usize>>,

    /// Byte range of `text` holding the heading, when it was found
    pub heading_span: Option<Range<usize>>,

    pub format: ContentFormat,
}

impl Document {
    /// Build a document from fetched content.
    pub fn from_content(content: &FetchedContent) -> Self {
        match content.format {
            ContentFormat::Markup => Self::from_markup(&content.body),
            ContentFormat::Text => Self::from_text(&content.body),
        }
    }

    /// Parse HTML.
    pub fn from_markup(markup: &str) -> Self {
        let html = Html::parse_document(markup);

        let title = select_text(&html, "title").map(|t| collapse_spaces(&t));
        let heading = select_text(&html, "h1").map(|t| collapse_spaces(&t));
        let meta_description = select_attr(&html, r#"meta[name="description"]"#, "content")
            .or_else(|| select_attr(&html, r#"meta[property="og:description"]"#, "content"))
            .map(|d| collapse_spaces(&d));
        let structured_address =
            structured_data_address(&html).or_else(|| street_address_fallback(markup));

        // The <title> lives in <head>, which the flattener skips; put it first
        let mut raw = String::new();
        if let Some(title) = &title {
            raw.push_str(title);
            raw.push('\n');
        }
        flatten(html.root_element(), &mut raw);

        let text = normalize_lines(&raw);
        let (title_span, heading_span) = locate_spans(&text, title.as_deref(), heading.as_deref());

        Self {
            text,
            title,
            heading,
            meta_description,
            structured_address,
            title_span,
            heading_span,
            format: ContentFormat::Markup,
        }
    }

    /// Parse reader-proxy output.
    ///
    /// The service prefixes its markdown with `Title:`, `URL Source:` and
    /// `Markdown Content:` lines.
    pub fn from_text(body: &str) -> Self {
        let decoded = decode_entities(body);

        let mut title = None;
        let mut lines = Vec::new();
        for line in decoded.lines() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("Title:") {
                if title.is_none() {
                    let rest = collapse_spaces(rest);
                    title = Some(rest.clone());
                    lines.push(rest);
                }
                continue;
            }
            if trimmed.starts_with("URL Source:")
                || trimmed.starts_with("Markdown Content:")
                || trimmed.starts_with("Published Time:")
            {
                continue;
            }
            lines.push(clean_markdown_line(trimmed));
        }

        let text = normalize_lines(&lines.join("\n"));
        let heading = decoded
            .lines()
            .find_map(|raw| raw.trim().strip_prefix("# "))
            .map(|h| collapse_spaces(&clean_markdown_line(h)))
            .filter(|h| !h.is_empty());
        let (title_span, heading_span) = locate_spans(&text, title.as_deref(), heading.as_deref());

        Self {
            text,
            title: title.filter(|t| !t.is_empty()),
            heading,
            meta_description: None,
            structured_address: None,
            title_span,
            heading_span,
            format: ContentFormat::Text,
        }
    }

    /// Whether a byte offset falls inside the title or heading.
    pub fn in_heading(&self, offset: usize) -> bool {
        [&self.title_span, &self.heading_span]
            .into_iter()
            .flatten()
            .any(|span| span.contains(&offset))
    }
}

fn flatten(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }
    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    flatten(child, out);
                }
            }
            _ => {}
        }
    }

    if block {
        out.push('\n');
    }
}

fn select_text(html: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    html.select(&selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn select_attr(html: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    html.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(String::from)
}

/// Address from JSON-LD blocks (`address.streetAddress`, locality, postcode).
fn structured_data_address(html: &Html) -> Option<String> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    html.select(&selector)
        .map(|el| el.text().collect::<String>())
        .filter_map(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .find_map(|json| find_postal_address(&json))
}

fn find_postal_address(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(street) = map.get("streetAddress").and_then(|v| v.as_str()) {
                let parts: Vec<&str> = [
                    Some(street),
                    map.get("addressLocality").and_then(|v| v.as_str()),
                    map.get("postalCode").and_then(|v| v.as_str()),
                ]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
                if !parts.is_empty() {
                    return Some(parts.join(", "));
                }
            }
            map.values().find_map(find_postal_address)
        }
        serde_json::Value::Array(items) => items.iter().find_map(find_postal_address),
        _ => None,
    }
}

/// Some sites embed JSON that is not valid JSON-LD; look for the key directly.
fn street_address_fallback(markup: &str) -> Option<String> {
    STREET_ADDRESS_REGEX
        .captures(markup)
        .map(|caps| caps["value"].trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_markdown_line(line: &str) -> String {
    let line = MD_IMAGE_REGEX.replace_all(line, "");
    let line = MD_LINK_REGEX.replace_all(&line, "$text");
    let line = MD_EMPHASIS_REGEX.replace_all(&line, "");
    line.trim_start_matches('#').trim().to_string()
}

fn collapse_spaces(s: &str) -> String {
    INLINE_SPACE_REGEX.replace_all(s.trim(), " ").into_owned()
}

/// Collapse inline whitespace and drop empty lines.
fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| collapse_spaces(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Locate the title, then the heading after it.
///
/// The heading usually repeats part of the title, so it is searched for
/// past the title span first.
fn locate_spans(
    text: &str,
    title: Option<&str>,
    heading: Option<&str>,
) -> (Option<Range<usize>>, Option<Range<usize>>) {
    let find_from = |needle: &str, cursor: usize| {
        text[cursor..]
            .find(needle)
            .map(|i| cursor + i)
            .or_else(|| text.find(needle))
            .map(|start| start..start + needle.len())
    };

    let title_span = title.filter(|t| !t.is_empty()).and_then(|t| find_from(t, 0));
    let cursor = title_span.as_ref().map_or(0, |span| span.end);
    let heading_span = heading
        .filter(|h| !h.is_empty())
        .and_then(|h| find_from(h, cursor));
    (title_span, heading_span)
}

/// Decode the entities that survive in reader-proxy output.
pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&pound;", "£")
        .replace("&#163;", "£")
        .replace("&#xA3;", "£")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
