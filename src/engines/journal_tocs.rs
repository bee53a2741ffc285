//! JournalTOCs engine: current-articles-by-ISSN over the journals RSS API.
//!
//! Not a query translator like the other engines: the backend is keyed by
//! ISSN and returns an RSS 1.0 feed with `dc:`/`prism:` extension metadata.
//! The service also reports account problems *inside* a syntactically valid
//! feed, so a fetch is only considered successful after the body has been
//! scanned for the backend's error phrasing.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::engines::{presence, EngineCapabilities, EngineError, SearchEngine};
use crate::models::{
    Author, FailureInfo, ItemFormat, Pagination, ResultItem, ResultSet, SearchQuery, SearchTerms,
};
use crate::utils::HttpClient;

const DEFAULT_BASE_URL: &str = "https://www.journaltocs.ac.uk/api/journals/";

/// Configuration for a JournalTOCs engine instance.
#[derive(Debug, Clone)]
pub struct JournalTocsConfig {
    /// Email address registered with JournalTOCs, injected as `user`.
    pub registered_email: String,
    /// API base override. Joined to the ISSN by concatenation, so it should
    /// end with `/`.
    pub base_url: Option<String>,
    /// Registry id override; defaults to `"journal_tocs"`.
    pub id: Option<String>,
}

impl JournalTocsConfig {
    pub fn new(registered_email: impl Into<String>) -> Self {
        Self {
            registered_email: registered_email.into(),
            base_url: None,
            id: None,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.registered_email.trim().is_empty() {
            return Err(EngineError::Configuration(
                "journal_tocs requires a registered_email".to_string(),
            ));
        }
        Ok(())
    }
}

/// JournalTOCs adapter.
#[derive(Debug, Clone)]
pub struct JournalTocsEngine {
    config: JournalTocsConfig,
    client: Arc<HttpClient>,
}

impl JournalTocsEngine {
    pub fn new(config: JournalTocsConfig) -> Result<Self, EngineError> {
        Self::with_client(config, Arc::new(HttpClient::new()))
    }

    pub fn with_client(
        config: JournalTocsConfig,
        client: Arc<HttpClient>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config, client })
    }

    // The base URL is deliberately not validated at construction: a bad
    // override surfaces as a Fetch error at call time, like any other
    // unreachable endpoint.
    fn feed_url(&self, issn: &str) -> Result<Url, EngineError> {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let raw = format!(
            "{}{}?output=articles&user={}",
            base,
            urlencoding::encode(issn.trim()),
            urlencoding::encode(&self.config.registered_email)
        );
        Url::parse(&raw).map_err(|e| EngineError::Fetch(format!("bad base url: {}", e)))
    }

    async fn fetch_body(&self, issn: &str) -> Result<String, EngineError> {
        let url = self.feed_url(issn)?;
        self.client
            .get_text(&url)
            .await
            .map_err(|f| EngineError::Fetch(f.message))
    }

    /// Fetch the raw articles feed for an ISSN.
    ///
    /// Fails with [`EngineError::Fetch`] on transport trouble, a non-2xx
    /// status, an unparseable body, or a backend-reported account error.
    pub async fn fetch_xml(&self, issn: &str) -> Result<String, EngineError> {
        let body = self.fetch_body(issn).await?;
        let feed: TocsFeed = quick_xml::de::from_str(&body)?;
        if let Some(message) = Self::backend_error(&feed) {
            return Err(EngineError::Fetch(message));
        }
        Ok(body)
    }

    /// Fetch and normalize the articles for an ISSN, newest first.
    ///
    /// An ISSN the service does not know yields an empty, successful set;
    /// only transport/account trouble is an error.
    pub async fn fetch_by_issn(&self, issn: &str) -> Result<ResultSet, EngineError> {
        let body = self.fetch_body(issn).await?;
        let feed: TocsFeed = quick_xml::de::from_str(&body)?;
        if let Some(message) = Self::backend_error(&feed) {
            tracing::warn!(engine = self.id(), error = %message, "backend reported an error");
            return Err(EngineError::Fetch(message));
        }

        let mut items: Vec<ResultItem> = feed.items.into_iter().map(Self::normalize_item).collect();

        // Feeds are roughly chronological but not reliably so; undated
        // items sink to the end.
        items.sort_by(|a, b| match (a.publication_date, b.publication_date) {
            (Some(a_date), Some(b_date)) => b_date.cmp(&a_date),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let total = items.len() as u64;
        let pagination = Pagination::from_start(0, items.len().max(1));
        Ok(ResultSet::success(self.id(), items, pagination).with_total(Some(total)))
    }

    fn backend_error(feed: &TocsFeed) -> Option<String> {
        let channel_texts = feed
            .channel
            .iter()
            .flat_map(|c| [c.title.as_deref(), c.description.as_deref()])
            .flatten();
        let item_texts = feed
            .items
            .iter()
            .flat_map(|i| [i.title.as_deref(), i.description.as_deref()])
            .flatten();

        for text in channel_texts.chain(item_texts) {
            let lower = text.to_lowercase();
            if (lower.contains("account") && lower.contains("invalid"))
                || lower.trim_start().starts_with("error:")
            {
                return Some(text.trim().to_string());
            }
        }
        None
    }

    fn normalize_item(raw: TocsItem) -> ResultItem {
        let mut item = ResultItem::new();

        item.title = presence(raw.title);
        item.link = presence(raw.link);
        item.abstract_text = presence(raw.description);
        item.source_title = presence(raw.publication_name);
        item.publisher = presence(raw.publisher);
        item.volume = presence(raw.volume);
        item.issue = presence(raw.number);
        item.start_page = presence(raw.starting_page);
        item.end_page = presence(raw.ending_page);
        item.issn = presence(raw.issn);
        item.format = Some(ItemFormat::Article);

        item.authors = raw
            .creators
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| Author::from_byline(name))
            .collect();

        item.doi = presence(raw.doi).or_else(|| {
            raw.identifiers.iter().find_map(|id| {
                let id = id.trim();
                id.strip_prefix("doi:")
                    .or_else(|| id.strip_prefix("DOI:"))
                    .map(|d| d.trim().to_string())
                    .or_else(|| {
                        id.split_once("doi.org/").map(|(_, d)| d.to_string())
                    })
            })
        });

        let date_text = presence(raw.cover_date).or_else(|| presence(raw.date));
        if let Some(text) = date_text {
            item.publication_date = parse_date(&text);
            item.year = item
                .publication_date
                .map(|d| d.format("%Y").to_string())
                .or_else(|| text.get(0..4).map(|y| y.to_string()));
        }

        item
    }
}

#[async_trait]
impl SearchEngine for JournalTocsEngine {
    fn id(&self) -> &str {
        self.config.id.as_deref().unwrap_or("journal_tocs")
    }

    fn name(&self) -> &str {
        "JournalTOCs"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH
    }

    /// Treats the query keywords as an ISSN. Fetch failures fold into a
    /// failed result set, preserving the trait's never-raises contract.
    async fn search(&self, query: &SearchQuery) -> ResultSet {
        let pagination = Pagination::from_start(0, query.per_page);
        let issn = match &query.terms {
            SearchTerms::Keywords(issn) => issn.trim().to_string(),
            SearchTerms::Fields(_) => {
                return ResultSet::failure(
                    self.id(),
                    pagination,
                    FailureInfo::new("journal_tocs searches by ISSN, not by fields"),
                )
            }
        };

        match self.fetch_by_issn(&issn).await {
            Ok(results) => results,
            Err(err) => ResultSet::failure(self.id(), pagination, FailureInfo::new(err.to_string())),
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(text, "%d %b %Y").ok()
}

// ---- RSS 1.0 feed schema (dc/prism extensions) ----

#[derive(Debug, Deserialize)]
struct TocsFeed {
    channel: Option<TocsChannel>,
    #[serde(rename = "item", default)]
    items: Vec<TocsItem>,
}

#[derive(Debug, Deserialize)]
struct TocsChannel {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TocsItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "dc:creator", default)]
    creators: Vec<String>,
    #[serde(rename = "dc:publisher")]
    publisher: Option<String>,
    #[serde(rename = "dc:date")]
    date: Option<String>,
    #[serde(rename = "dc:identifier", default)]
    identifiers: Vec<String>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<String>,
    #[serde(rename = "prism:issn")]
    issn: Option<String>,
    #[serde(rename = "prism:volume")]
    volume: Option<String>,
    #[serde(rename = "prism:number")]
    number: Option<String>,
    #[serde(rename = "prism:startingPage")]
    starting_page: Option<String>,
    #[serde(rename = "prism:endingPage")]
    ending_page: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    #[serde(rename = "prism:doi")]
    doi: Option<String>,
}
