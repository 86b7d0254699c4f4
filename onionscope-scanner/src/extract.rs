//! Turns raw markup into a structured [`PageRecord`].
//!
//! Extraction never touches the network; it is a function of the page URL
//! (used to absolutize links and images) and the markup.

use crate::error::ParseError;
use crate::page::{
    Form, FormField, Heading, HiddenElement, Image, Link, ListBlock, ListKind, PageRecord, Table,
};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Class names that mark an element as hidden from casual visitors.
pub const HIDDEN_CLASSES: [&str; 4] = ["hidden", "hide", "invisible", "collapsed"];

const NO_TITLE: &str = "No title";

/// Elements whose text is code or markup, not page content.
const NON_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static HEADINGS: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3, h4, h5, h6"));
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static LISTS: LazyLock<Selector> = LazyLock::new(|| selector("ul, ol"));
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static TABLES: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELLS: LazyLock<Selector> = LazyLock::new(|| selector("td, th"));
static FORMS: LazyLock<Selector> = LazyLock::new(|| selector("form"));
static FIELDS: LazyLock<Selector> = LazyLock::new(|| selector("input, textarea, select"));
static IMAGES: LazyLock<Selector> = LazyLock::new(|| selector("img[src]"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static ALL: LazyLock<Selector> = LazyLock::new(|| selector("*"));

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every structured element from `raw_html`.
    ///
    /// The returned record has an empty classification map; classification
    /// is the caller's job.
    pub fn extract(&self, url: &str, raw_html: &str) -> Result<PageRecord, ParseError> {
        if raw_html.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        if raw_html.contains('\0') {
            return Err(ParseError::BinaryContent);
        }
        let base = Url::parse(url).map_err(|_| ParseError::InvalidBaseUrl(url.to_string()))?;

        let document = Html::parse_document(raw_html);

        let mut record = PageRecord::new(url.to_string());
        record.title = document_title(&document);
        record.headings = extract_headings(&document);
        record.paragraphs = extract_paragraphs(&document);
        record.lists = extract_lists(&document);
        record.tables = extract_tables(&document);
        record.forms = extract_forms(&document);
        record.images = extract_images(&document, &base);
        record.links = extract_links(&document, &base);
        record.hidden_content = extract_hidden(&document);
        record.full_text = document_text(&document);

        debug!(
            "Extracted {} from {}: {} headings, {} paragraphs, {} links ({} onion), {} hidden",
            record.title,
            url,
            record.headings.len(),
            record.paragraphs.len(),
            record.links.len(),
            record.onion_links().count(),
            record.hidden_content.len()
        );

        Ok(record)
    }
}

/// Whitespace-collapsed text of an element and its descendants.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn document_title(document: &Html) -> String {
    document
        .select(&TITLE)
        .next()
        .map(|title| element_text(&title))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Every text node of a document outside script-like elements, one
/// whitespace-collapsed line per node.
pub fn document_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| NON_TEXT_ELEMENTS.contains(&element.name()))
            })
        })
        .map(|(_, text)| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    document
        .select(&HEADINGS)
        .filter_map(|heading| {
            let level = heading.value().name()[1..].parse::<u8>().ok()?;
            Some(Heading {
                level,
                text: element_text(&heading),
            })
        })
        .collect()
}

fn extract_paragraphs(document: &Html) -> Vec<String> {
    document
        .select(&PARAGRAPHS)
        .map(|p| element_text(&p))
        .filter(|text| !text.is_empty())
        .collect()
}

fn extract_lists(document: &Html) -> Vec<ListBlock> {
    document
        .select(&LISTS)
        .map(|list| {
            let kind = if list.value().name() == "ol" {
                ListKind::Ordered
            } else {
                ListKind::Unordered
            };
            let items = list.select(&LIST_ITEMS).map(|li| element_text(&li)).collect();
            ListBlock { kind, items }
        })
        .collect()
}

fn extract_tables(document: &Html) -> Vec<Table> {
    document
        .select(&TABLES)
        .filter_map(|table| {
            let rows: Table = table
                .select(&ROWS)
                .map(|tr| tr.select(&CELLS).map(|cell| element_text(&cell)).collect::<Vec<_>>())
                .filter(|cells| !cells.is_empty())
                .collect();
            (!rows.is_empty()).then_some(rows)
        })
        .collect()
}

fn extract_forms(document: &Html) -> Vec<Form> {
    document
        .select(&FORMS)
        .map(|form| {
            let fields = form
                .select(&FIELDS)
                .map(|field| {
                    let tag = field.value().name().to_string();
                    let input_type = (tag == "input")
                        .then(|| field.value().attr("type").unwrap_or("text").to_lowercase());
                    FormField {
                        kind: tag,
                        name: field.value().attr("name").unwrap_or_default().to_string(),
                        input_type,
                    }
                })
                .collect();

            Form {
                action: form.value().attr("action").unwrap_or_default().to_string(),
                method: form
                    .value()
                    .attr("method")
                    .unwrap_or("get")
                    .to_lowercase(),
                fields,
            }
        })
        .collect()
}

fn extract_images(document: &Html, base: &Url) -> Vec<Image> {
    document
        .select(&IMAGES)
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            let absolute = base.join(src).ok()?;
            Some(Image {
                src: absolute.to_string(),
                alt: img.value().attr("alt").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

fn extract_links(document: &Html, base: &Url) -> Vec<Link> {
    document
        .select(&ANCHORS)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let absolute = resolve_link(base, href)?;
            Some(Link {
                is_onion: is_onion_url(&absolute),
                url: absolute.to_string(),
                text: element_text(&anchor),
            })
        })
        .collect()
}

fn extract_hidden(document: &Html) -> Vec<HiddenElement> {
    document
        .select(&ALL)
        .filter(is_hidden)
        .map(|element| HiddenElement {
            tag: element.value().name().to_string(),
            text: element_text(&element),
        })
        .collect()
}

fn is_hidden(element: &ElementRef) -> bool {
    let styled_hidden = element.value().attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    });

    styled_hidden
        || element
            .value()
            .classes()
            .any(|class| HIDDEN_CLASSES.contains(&class))
}

/// Resolve `href` against `base`, dropping fragments and non-navigable schemes.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

/// True when the host sits under the `.onion` pseudo-TLD.
pub fn is_onion_url(url: &Url) -> bool {
    url.host_str().is_some_and(|host| {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host.ends_with(".onion")
    })
}
