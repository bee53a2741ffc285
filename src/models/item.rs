//! Normalized citation model produced by every search engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bibliographic format of a normalized result.
///
/// Backends rarely state this directly; the EBSCO engine in particular
/// derives it from an ordered rule list over loosely-typed metadata
/// (see [`crate::engines::ebsco_format`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFormat {
    Article,
    Book,
    /// A chapter, essay, or other part contained in a book.
    BookItem,
    Dissertation,
    ConferencePaper,
    Serial,
    #[serde(untagged)]
    Other(String),
}

impl ItemFormat {
    /// Human-readable label for the format.
    pub fn label(&self) -> &str {
        match self {
            ItemFormat::Article => "Article",
            ItemFormat::Book => "Book",
            ItemFormat::BookItem => "Book Chapter",
            ItemFormat::Dissertation => "Dissertation",
            ItemFormat::ConferencePaper => "Conference Paper",
            ItemFormat::Serial => "Journal/Serial",
            ItemFormat::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ItemFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One author of a citation.
///
/// At least one of `last` or `display` should be present for the item to
/// render meaningfully, but absence is valid and means the backend did not
/// name the author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub first: Option<String>,
    pub last: Option<String>,
    /// Pre-formatted display form, used verbatim when present.
    pub display: Option<String>,
}

impl Author {
    /// Author known only by a pre-formatted display string.
    pub fn from_display(display: impl Into<String>) -> Self {
        Author {
            display: Some(display.into()),
            ..Author::default()
        }
    }

    /// Parse a `"Last, First"` byline; anything without a comma becomes a
    /// display-only author.
    pub fn from_byline(byline: &str) -> Self {
        let byline = byline.trim();
        match byline.split_once(',') {
            Some((last, first)) if !last.trim().is_empty() && !first.trim().is_empty() => Author {
                first: Some(first.trim().to_string()),
                last: Some(last.trim().to_string()),
                display: Some(byline.to_string()),
            },
            _ => Author::from_display(byline),
        }
    }
}

/// A hyperlink attached to a result item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub label: Option<String>,
    pub rel: Option<String>,
    #[serde(default)]
    pub style_classes: Vec<String>,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Link {
            url: url.into(),
            ..Link::default()
        }
    }
}

/// A single normalized citation from any backend.
///
/// `None` means the backend did not supply the field; consumers are expected
/// to omit absent fields rather than render empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Authors in the order the backend listed them.
    #[serde(default)]
    pub authors: Vec<Author>,
    pub year: Option<String>,
    pub format: Option<ItemFormat>,
    /// Title of the containing publication (journal, or book for chapters).
    pub source_title: Option<String>,
    pub publisher: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub start_page: Option<String>,
    pub end_page: Option<String>,
    pub doi: Option<String>,
    pub issn: Option<String>,
    pub oclcnum: Option<String>,
    pub language_code: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Full publication date when the backend supplies one; `year` is the
    /// display form.
    pub publication_date: Option<chrono::NaiveDate>,
    /// Primary link to the record on the backend's platform.
    pub link: Option<String>,
    #[serde(default)]
    pub other_links: Vec<Link>,
    /// Whether `link` resolves to full text rather than a citation page.
    #[serde(default)]
    pub link_is_fulltext: bool,
    /// Backend-specific identifier, round-trippable into `get()`.
    ///
    /// For EBSCO this is `"<database>:<accession_number>"` and contains
    /// exactly one `:` separator.
    pub unique_id: Option<String>,
    /// Backend-specific extras that have no normalized slot.
    #[serde(default)]
    pub custom_data: HashMap<String, serde_json::Value>,
}

impl ResultItem {
    pub fn new() -> Self {
        ResultItem::default()
    }
}
