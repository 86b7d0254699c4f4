use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    #[serde(rename = "type")]
    pub kind: ListKind,
    pub items: Vec<String>,
}

/// Rows of cells, in document order.
pub type Table = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Tag name: `input`, `textarea` or `select`
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub action: String,
    pub method: String,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
    pub is_onion: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenElement {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    Pattern,
    Keyword,
    Url,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: EvidenceSource,
    pub matched_text: String,
    pub context: String,
}

/// Confidence and evidence for one category on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    /// 1 (lowest) to 5 (highest)
    pub severity: u8,
    /// 0 to 100
    pub confidence: f64,
    pub evidence: Vec<Evidence>,
}

/// Everything recorded about one processed URL.
///
/// A record either carries extracted content or an `error`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub fetched_at: DateTime<Utc>,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub lists: Vec<ListBlock>,
    pub tables: Vec<Table>,
    pub forms: Vec<Form>,
    pub images: Vec<Image>,
    pub links: Vec<Link>,
    pub hidden_content: Vec<HiddenElement>,
    /// Every text node of the document, including blocks no other field
    /// captures.
    #[serde(default)]
    pub full_text: String,
    pub classification: BTreeMap<String, ClassificationResult>,
    pub error: Option<String>,
    #[serde(default)]
    pub requires_login: bool,
}

impl PageRecord {
    pub fn new(url: String) -> Self {
        Self {
            url,
            title: String::new(),
            fetched_at: Utc::now(),
            headings: Vec::new(),
            paragraphs: Vec::new(),
            lists: Vec::new(),
            tables: Vec::new(),
            forms: Vec::new(),
            images: Vec::new(),
            links: Vec::new(),
            hidden_content: Vec::new(),
            full_text: String::new(),
            classification: BTreeMap::new(),
            error: None,
            requires_login: false,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Onion-domain links discovered on the page, in document order.
    pub fn onion_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.is_onion)
    }

    /// The body handed to the classifier.
    ///
    /// Document text plus image alt text, which no text node carries.
    /// Records without document text fall back to the structured fields.
    pub fn classification_text(&self) -> String {
        if self.full_text.trim().is_empty() {
            return self.text_content();
        }
        let mut text = self.full_text.clone();
        for alt in self.images.iter().map(|i| i.alt.trim()).filter(|a| !a.is_empty()) {
            text.push('\n');
            text.push_str(alt);
        }
        text
    }

    /// All extracted text joined into one classifiable body.
    ///
    /// Blocks are newline separated so sentence segmentation never merges
    /// the tail of one block with the head of the next.
    pub fn text_content(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.push(&self.title);
        parts.extend(self.headings.iter().map(|h| h.text.as_str()));
        parts.extend(self.paragraphs.iter().map(String::as_str));
        for list in &self.lists {
            parts.extend(list.items.iter().map(String::as_str));
        }
        for table in &self.tables {
            for row in table {
                parts.extend(row.iter().map(String::as_str));
            }
        }
        parts.extend(self.images.iter().map(|i| i.alt.as_str()));
        parts.extend(self.links.iter().map(|l| l.text.as_str()));
        parts.extend(self.hidden_content.iter().map(|h| h.text.as_str()));

        parts
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
