//! Format classification for EBSCO records.
//!
//! EIT records do not reliably state whether a citation is a book, a piece
//! of a book, a dissertation, or an article; some databases (RILM
//! especially) carry contradictory markers. Classification is therefore an
//! ordered rule list over a pre-parsed summary of the record: the first
//! rule that returns a format wins, and anything no rule claims is an
//! article. Misclassifications get fixed by inserting a rule and a fixture,
//! not by widening an existing predicate.

use crate::models::ItemFormat;

/// The metadata signals classification runs on, extracted from a raw
/// record before normalization finishes.
#[derive(Debug, Clone, Default)]
pub struct FormatSignals<'a> {
    /// Backend document type, e.g. `"Article"`, `"Book Chapter"`.
    pub doctype: Option<&'a str>,
    /// Backend publication type, e.g. `"Academic Journal"`, `"Book"`.
    pub pubtype: Option<&'a str>,
    /// Dissertation note, when the record carries one.
    pub dissertation_note: Option<&'a str>,
    /// The record sits inside a named book (container title differs from
    /// the record's own title).
    pub in_book_container: bool,
    /// The record sits inside a journal.
    pub in_journal: bool,
    pub has_publisher: bool,
    pub has_year: bool,
}

/// One classification rule: a named predicate that either claims the
/// record or passes.
pub struct FormatRule {
    pub name: &'static str,
    pub applies: fn(&FormatSignals) -> Option<ItemFormat>,
}

impl std::fmt::Debug for FormatRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRule").field("name", &self.name).finish()
    }
}

fn type_contains(signals: &FormatSignals, needles: &[&str]) -> bool {
    [signals.doctype, signals.pubtype]
        .iter()
        .flatten()
        .any(|value| {
            let value = value.to_ascii_lowercase();
            needles.iter().any(|needle| value.contains(needle))
        })
}

fn dissertation_marker(signals: &FormatSignals) -> Option<ItemFormat> {
    if signals.dissertation_note.is_some() || type_contains(signals, &["dissertation", "thesis"]) {
        Some(ItemFormat::Dissertation)
    } else {
        None
    }
}

fn explicit_chapter(signals: &FormatSignals) -> Option<ItemFormat> {
    if type_contains(signals, &["chapter", "essay"]) {
        Some(ItemFormat::BookItem)
    } else {
        None
    }
}

fn conference_paper(signals: &FormatSignals) -> Option<ItemFormat> {
    if type_contains(signals, &["conference", "proceeding"]) {
        Some(ItemFormat::ConferencePaper)
    } else {
        None
    }
}

fn contained_in_book(signals: &FormatSignals) -> Option<ItemFormat> {
    // A containing book title outranks any "Book" pubtype: RILM marks
    // chapters with pubtype Book but still names the collection.
    if signals.in_book_container {
        Some(ItemFormat::BookItem)
    } else {
        None
    }
}

fn explicit_book(signals: &FormatSignals) -> Option<ItemFormat> {
    if !signals.in_journal && type_contains(signals, &["book"]) {
        Some(ItemFormat::Book)
    } else {
        None
    }
}

fn untyped_monograph(signals: &FormatSignals) -> Option<ItemFormat> {
    // No container, no stated type, but publisher and year: a standalone
    // monograph with stunted metadata.
    if !signals.in_journal
        && signals.doctype.is_none()
        && signals.pubtype.is_none()
        && signals.has_publisher
        && signals.has_year
    {
        Some(ItemFormat::Book)
    } else {
        None
    }
}

fn stated_article(signals: &FormatSignals) -> Option<ItemFormat> {
    if type_contains(signals, &["article", "review"]) {
        Some(ItemFormat::Article)
    } else {
        None
    }
}

/// Rules in priority order. Order matters: dissertation markers beat
/// containment, containment beats a stated "Book" type.
pub const RULES: &[FormatRule] = &[
    FormatRule { name: "dissertation_marker", applies: dissertation_marker },
    FormatRule { name: "explicit_chapter", applies: explicit_chapter },
    FormatRule { name: "conference_paper", applies: conference_paper },
    FormatRule { name: "contained_in_book", applies: contained_in_book },
    FormatRule { name: "explicit_book", applies: explicit_book },
    FormatRule { name: "untyped_monograph", applies: untyped_monograph },
    FormatRule { name: "stated_article", applies: stated_article },
];

/// Classify a record; falls back to [`ItemFormat::Article`] when no rule
/// claims it.
pub fn classify(signals: &FormatSignals) -> ItemFormat {
    for rule in RULES {
        if let Some(format) = (rule.applies)(signals) {
            tracing::trace!(rule = rule.name, format = %format, "format classified");
            return format;
        }
    }
    ItemFormat::Article
}
