//! WorldCat SRU search engine, requesting Dublin-Core record packing.
//!
//! The MARCXML response would carry far richer metadata, but the DC
//! response is what the Search API serves cheaply; the normalizer does
//! what it can with a deliberately stunted schema (no page numbers, no
//! reliable format statement, dates like `c1996.`).

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::OnceLock;
use url::Url;

use crate::engines::{presence, EngineCapabilities, EngineError, SearchEngine};
use crate::models::{
    Author, FailureInfo, ItemFormat, Pagination, ResultItem, ResultSet, SearchQuery, SearchTerms,
    SemanticField, Sort,
};
use crate::utils::HttpClient;

const DEFAULT_BASE_URL: &str = "https://worldcat.org/webservices/catalog/search/sru";
const RECORD_SCHEMA: &str = "info:srw/schema/1/dc";

/// The SRU endpoint rejects any `startRecord` beyond this; requests past it
/// are silently clamped.
const MAX_START_RECORD: u64 = 9999;

/// Configuration for a WorldCat SRU engine instance.
#[derive(Debug, Clone)]
pub struct WorldcatSruDcConfig {
    /// WorldCat Search API key, injected as `wskey`.
    pub api_key: String,
    /// Request the authenticated `servicelevel=full` by default.
    /// Overridable per call via [`SearchQuery::auth`].
    pub auth: bool,
    /// Registry id override; defaults to `"worldcat_sru_dc"`.
    pub id: Option<String>,
    /// Endpoint override (tests, proxies).
    pub base_url: Option<String>,
}

impl WorldcatSruDcConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth: false,
            id: None,
            base_url: None,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.api_key.trim().is_empty() {
            return Err(EngineError::Configuration(
                "worldcat_sru_dc requires an api_key".to_string(),
            ));
        }
        Ok(())
    }
}

/// WorldCat SRU adapter.
#[derive(Debug, Clone)]
pub struct WorldcatSruDcEngine {
    config: WorldcatSruDcConfig,
    base: Url,
    client: Arc<HttpClient>,
}

impl WorldcatSruDcEngine {
    pub fn new(config: WorldcatSruDcConfig) -> Result<Self, EngineError> {
        Self::with_client(config, Arc::new(HttpClient::new()))
    }

    pub fn with_client(
        config: WorldcatSruDcConfig,
        client: Arc<HttpClient>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let base = Url::parse(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
            .map_err(|e| EngineError::Configuration(format!("bad worldcat_sru_dc base_url: {}", e)))?;
        Ok(Self {
            config,
            base,
            client,
        })
    }

    fn sru_index(field: SemanticField) -> Option<&'static str> {
        match field {
            SemanticField::Author => Some("srw.au"),
            SemanticField::Title => Some("srw.ti"),
            SemanticField::Subject => Some("srw.su"),
            SemanticField::Isbn => Some("srw.bn"),
            SemanticField::Issn => Some("srw.in"),
            SemanticField::OclcNumber => Some("srw.no"),
            _ => None,
        }
    }

    // Whitespace split that keeps double-quoted phrases together.
    fn split_terms(text: &str) -> Vec<String> {
        let mut terms = Vec::new();
        let mut current = String::new();
        let mut in_phrase = false;

        for ch in text.chars() {
            if ch == '"' {
                in_phrase = !in_phrase;
                current.push(ch);
            } else if ch.is_whitespace() && !in_phrase {
                if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            terms.push(current);
        }
        terms
    }

    fn cql_clause(index: &str, value: &str) -> String {
        // Surrounding phrase quotes become the clause's own quoting;
        // interior quotes are escaped.
        let value = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            &value[1..value.len() - 1]
        } else {
            value
        };
        format!("{} = \"{}\"", index, value.replace('"', "\\\""))
    }

    /// Build the CQL query string for a normalized request.
    pub fn construct_cql_query(query: &SearchQuery) -> String {
        match &query.terms {
            SearchTerms::Fields(fields) => {
                let mut clauses: Vec<String> = fields
                    .iter()
                    .filter_map(|(field, value)| {
                        Self::sru_index(*field).map(|index| Self::cql_clause(index, value))
                    })
                    .collect();
                clauses.sort();
                clauses.join(" AND ")
            }
            SearchTerms::Keywords(text) => {
                let index = query
                    .search_field
                    .clone()
                    .or_else(|| query.semantic_field.and_then(|f| Self::sru_index(f).map(String::from)));
                match index {
                    Some(index) => Self::cql_clause(&index, text),
                    None => Self::split_terms(text)
                        .iter()
                        .map(|term| Self::cql_clause("srw.kw", term))
                        .collect::<Vec<_>>()
                        .join(" AND "),
                }
            }
        }
    }

    fn clamped_start_record(start: usize) -> u64 {
        (start as u64 + 1).min(MAX_START_RECORD)
    }

    fn effective_auth(&self, query: &SearchQuery) -> bool {
        query.auth.unwrap_or(self.config.auth)
    }

    /// The full outbound request URL for a query.
    pub fn construct_query_url(&self, query: &SearchQuery) -> Url {
        let mut url = self.base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &Self::construct_cql_query(query));
            pairs.append_pair("wskey", &self.config.api_key);
            pairs.append_pair("recordSchema", RECORD_SCHEMA);
            pairs.append_pair("maximumRecords", &query.per_page.to_string());
            pairs.append_pair(
                "startRecord",
                &Self::clamped_start_record(query.start).to_string(),
            );
            pairs.append_pair(
                "sortKeys",
                match query.sort {
                    Sort::Relevance => "relevance",
                    Sort::DateDesc => "Date,,0",
                },
            );
            if self.effective_auth(query) {
                pairs.append_pair("servicelevel", "full");
            }
        }
        url
    }

    fn parse_response(body: &str) -> Result<SruResponse, EngineError> {
        Ok(quick_xml::de::from_str(body)?)
    }

    fn diagnostic_message(parsed: &SruResponse) -> Option<String> {
        let diagnostics = parsed.diagnostics.as_ref()?;
        let messages: Vec<String> = diagnostics
            .diagnostics
            .iter()
            .filter_map(|d| {
                let message = presence(d.message.clone())?;
                match presence(d.details.clone()) {
                    Some(details) => Some(format!("{} ({})", message, details)),
                    None => Some(message),
                }
            })
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }

    fn normalize_record(record: SruRecord) -> Option<ResultItem> {
        let dc = record.record_data?.oclcdcs?;
        let mut item = ResultItem::new();

        let oclcnum = dc.record_identifiers.iter().find_map(|id| presence(Some(id.clone())));
        item.oclcnum = oclcnum.clone();
        item.unique_id = oclcnum.clone();
        item.link = oclcnum.map(|n| format!("https://worldcat.org/oclc/{}", n));

        item.title = dc.titles.into_iter().find_map(|t| presence(Some(t)));

        item.authors = dc
            .creators
            .iter()
            .chain(dc.contributors.iter())
            .filter(|name| !name.trim().is_empty())
            .map(|name| Author::from_byline(name))
            .collect();

        item.publisher = dc.publishers.into_iter().find_map(|p| presence(Some(p)));
        item.abstract_text = dc.descriptions.into_iter().find_map(|d| presence(Some(d)));
        item.language_code = dc.languages.into_iter().find_map(|l| presence(Some(l)));

        // DC dates arrive as free text ("c1996.", "[2004]"); take the first
        // four-digit run.
        item.year = dc.dates.iter().find_map(|d| first_year(d));

        for identifier in &dc.identifiers {
            let identifier = identifier.trim();
            if identifier.is_empty() {
                continue;
            }
            if let Some(isbn) = identifier.strip_prefix("URN:ISBN:") {
                item.custom_data
                    .entry("isbn".to_string())
                    .or_insert_with(|| serde_json::Value::String(isbn.to_string()));
            } else if looks_like_issn(identifier) {
                item.issn.get_or_insert_with(|| identifier.to_string());
            }
        }

        item.format = Some(Self::guess_format(&dc.types, &dc.formats));

        Some(item)
    }

    fn guess_format(types: &[String], formats: &[String]) -> ItemFormat {
        let haystack = types
            .iter()
            .chain(formats.iter())
            .map(|s| s.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if haystack.contains("thesis") || haystack.contains("dissertation") {
            ItemFormat::Dissertation
        } else if haystack.contains("article") {
            ItemFormat::Article
        } else if haystack.contains("periodical") || haystack.contains("journal") {
            ItemFormat::Serial
        } else {
            // The catalog is overwhelmingly monographs and the DC schema
            // says little else; book is the honest default.
            ItemFormat::Book
        }
    }

    fn normalize_response(parsed: SruResponse) -> (Option<u64>, Vec<ResultItem>) {
        let total = parsed.number_of_records;
        let items = parsed
            .records
            .map(|r| r.records)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Self::normalize_record)
            .collect();
        (total, items)
    }
}

#[async_trait]
impl SearchEngine for WorldcatSruDcEngine {
    fn id(&self) -> &str {
        self.config.id.as_deref().unwrap_or("worldcat_sru_dc")
    }

    fn name(&self) -> &str {
        "WorldCat"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET
    }

    async fn search(&self, query: &SearchQuery) -> ResultSet {
        let pagination = Pagination::from_start_record(
            Self::clamped_start_record(query.start),
            query.per_page as u64,
        );
        let url = self.construct_query_url(query);

        let body = match self.client.get_text(&url).await {
            Ok(body) => body,
            Err(failure) => {
                return ResultSet::failure(
                    self.id(),
                    pagination,
                    FailureInfo {
                        error_info: failure.message,
                        status: failure.status,
                    },
                )
            }
        };

        let parsed = match Self::parse_response(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                return ResultSet::failure(self.id(), pagination, FailureInfo::new(err.to_string()))
            }
        };

        if let Some(message) = Self::diagnostic_message(&parsed) {
            tracing::warn!(engine = self.id(), error = %message, "SRU diagnostics in response");
            return ResultSet::failure(self.id(), pagination, FailureInfo::new(message));
        }

        let (total, items) = Self::normalize_response(parsed);
        ResultSet::success(self.id(), items, pagination).with_total(total)
    }

    async fn get(&self, identifier: &str) -> Result<ResultItem, EngineError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(EngineError::InvalidIdentifier(
                "empty OCLC number".to_string(),
            ));
        }

        let query = SearchQuery::new(identifier)
            .search_field("srw.no")
            .per_page(1);
        let url = self.construct_query_url(&query);

        let body = self
            .client
            .get_text(&url)
            .await
            .map_err(|f| EngineError::Fetch(f.message))?;
        let parsed = Self::parse_response(&body)?;

        if let Some(message) = Self::diagnostic_message(&parsed) {
            return Err(EngineError::Fetch(message));
        }

        let (_, items) = Self::normalize_response(parsed);
        items
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NotFound(identifier.to_string()))
    }
}

fn first_year(text: &str) -> Option<String> {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    let re = YEAR_RE.get_or_init(|| Regex::new(r"\d{4}").expect("static pattern"));
    re.find(text).map(|m| m.as_str().to_string())
}

fn looks_like_issn(text: &str) -> bool {
    static ISSN_RE: OnceLock<Regex> = OnceLock::new();
    let re = ISSN_RE.get_or_init(|| Regex::new(r"^\d{4}-?\d{3}[\dXx]$").expect("static pattern"));
    re.is_match(text)
}

// ---- SRU-DC response schema ----

#[derive(Debug, Deserialize)]
struct SruResponse {
    #[serde(rename = "numberOfRecords")]
    number_of_records: Option<u64>,
    records: Option<SruRecords>,
    diagnostics: Option<SruDiagnostics>,
}

#[derive(Debug, Deserialize)]
struct SruRecords {
    #[serde(rename = "record", default)]
    records: Vec<SruRecord>,
}

#[derive(Debug, Deserialize)]
struct SruRecord {
    #[serde(rename = "recordData")]
    record_data: Option<SruRecordData>,
}

#[derive(Debug, Deserialize)]
struct SruRecordData {
    oclcdcs: Option<OclcDcRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct OclcDcRecord {
    #[serde(rename = "dc:title", default)]
    titles: Vec<String>,
    #[serde(rename = "dc:creator", default)]
    creators: Vec<String>,
    #[serde(rename = "dc:contributor", default)]
    contributors: Vec<String>,
    #[serde(rename = "dc:publisher", default)]
    publishers: Vec<String>,
    #[serde(rename = "dc:date", default)]
    dates: Vec<String>,
    #[serde(rename = "dc:description", default)]
    descriptions: Vec<String>,
    #[serde(rename = "dc:language", default)]
    languages: Vec<String>,
    #[serde(rename = "dc:identifier", default)]
    identifiers: Vec<String>,
    #[serde(rename = "dc:type", default)]
    types: Vec<String>,
    #[serde(rename = "dc:format", default)]
    formats: Vec<String>,
    #[serde(rename = "oclcterms:recordIdentifier", default)]
    record_identifiers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SruDiagnostics {
    #[serde(rename = "diagnostic", default)]
    diagnostics: Vec<SruDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct SruDiagnostic {
    #[serde(rename = "uri")]
    #[allow(dead_code)]
    uri: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn engine() -> WorldcatSruDcEngine {
        WorldcatSruDcEngine::new(WorldcatSruDcConfig::new("DUMMY_API_KEY")).unwrap()
    }

    fn params(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn construct_url() {
        let engine = engine();
        let query = SearchQuery::new("cancer's \"one two\"").per_page(10);
        let url = engine.construct_query_url(&query);
        let pairs = params(&url);

        assert_eq!(param(&pairs, "wskey"), vec!["DUMMY_API_KEY"]);
        assert_eq!(param(&pairs, "recordSchema"), vec!["info:srw/schema/1/dc"]);
        assert_eq!(
            param(&pairs, "query"),
            vec![WorldcatSruDcEngine::construct_cql_query(&query).as_str()]
        );
    }

    #[test]
    fn construct_pagination() {
        let url = engine().construct_query_url(&SearchQuery::new("cancer").per_page(20).start(20));
        let pairs = params(&url);

        assert_eq!(param(&pairs, "maximumRecords"), vec!["20"]);
        assert_eq!(param(&pairs, "startRecord"), vec!["21"]);
    }

    #[test]
    fn pagination_clamps_at_service_maximum() {
        assert_eq!(WorldcatSruDcEngine::clamped_start_record(100_000), 9999);

        let url = engine().construct_query_url(&SearchQuery::new("cancer").start(100_000).per_page(10));
        assert_eq!(param(&params(&url), "startRecord"), vec!["9999"]);

        let pagination = Pagination::from_start_record(9999, 10);
        assert_eq!(pagination.start_record, 9999);
        assert_eq!(pagination.current_page, 1000);
    }

    #[test]
    fn construct_sort() {
        let url = engine().construct_query_url(&SearchQuery::new("cancer").sort(Sort::DateDesc));
        assert!(!param(&params(&url), "sortKeys").is_empty());
    }

    #[test]
    fn construct_fielded_search() {
        let cql = WorldcatSruDcEngine::construct_cql_query(
            &SearchQuery::new("cancer").search_field("srw.ti"),
        );
        assert_eq!(cql, "srw.ti = \"cancer\"");
    }

    #[test]
    fn construct_servicelevel() {
        let engine = engine();

        let url = engine.construct_query_url(&SearchQuery::new("cancer"));
        assert!(param(&params(&url), "servicelevel").is_empty());

        let url = engine.construct_query_url(&SearchQuery::new("cancer auth").auth(true));
        assert_eq!(param(&params(&url), "servicelevel"), vec!["full"]);

        let mut config = WorldcatSruDcConfig::new("DUMMY_API_KEY");
        config.auth = true;
        let default_on = WorldcatSruDcEngine::new(config).unwrap();

        let url = default_on.construct_query_url(&SearchQuery::new("cancer"));
        assert_eq!(param(&params(&url), "servicelevel"), vec!["full"]);

        let url = default_on.construct_query_url(&SearchQuery::new("cancer").auth(false));
        assert!(param(&params(&url), "servicelevel").is_empty());
    }

    #[test]
    fn construct_cql_escapes_and_phrases() {
        let cql = WorldcatSruDcEngine::construct_cql_query(&SearchQuery::new(
            "alpha's beta \"one two\" thr\"ee",
        ));
        let components: Vec<&str> = cql.split(" AND ").collect();

        assert_eq!(components.len(), 4);
        for clause in [
            "srw.kw = \"beta\"",
            "srw.kw = \"alpha's\"",
            "srw.kw = \"one two\"",
            "srw.kw = \"thr\\\"ee\"",
        ] {
            assert!(components.contains(&clause), "missing clause: {}", clause);
        }
    }

    #[test]
    fn construct_cql_multi_field() {
        let mut fields = HashMap::new();
        fields.insert(SemanticField::Title, "manufacturing".to_string());
        fields.insert(SemanticField::Author, "chomsky".to_string());

        let cql = WorldcatSruDcEngine::construct_cql_query(&SearchQuery::fields(fields));
        let components: Vec<&str> = cql.split(" AND ").collect();

        assert_eq!(components.len(), 2);
        assert!(components.contains(&"srw.au = \"chomsky\""));
        assert!(components.contains(&"srw.ti = \"manufacturing\""));
    }

    const DC_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
  <version>1.1</version>
  <numberOfRecords>1808</numberOfRecords>
  <records>
    <record>
      <recordSchema>info:srw/schema/1/dc</recordSchema>
      <recordData>
        <oclcdcs>
          <dc:creator xmlns:dc="http://purl.org/dc/elements/1.1/">Goldman, Emma, 1869-1940.</dc:creator>
          <dc:date xmlns:dc="http://purl.org/dc/elements/1.1/">c1996.</dc:date>
          <dc:description xmlns:dc="http://purl.org/dc/elements/1.1/">An anthology of anarchist essays.</dc:description>
          <dc:identifier xmlns:dc="http://purl.org/dc/elements/1.1/">URN:ISBN:9780391234567</dc:identifier>
          <dc:language xmlns:dc="http://purl.org/dc/elements/1.1/">eng</dc:language>
          <dc:publisher xmlns:dc="http://purl.org/dc/elements/1.1/">Humanity Books</dc:publisher>
          <dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">Anarchism and other essays</dc:title>
          <dc:type xmlns:dc="http://purl.org/dc/elements/1.1/">text</dc:type>
          <oclcterms:recordIdentifier xmlns:oclcterms="http://purl.oclc.org/oclc/terms/">34912804</oclcterms:recordIdentifier>
        </oclcdcs>
      </recordData>
    </record>
  </records>
</searchRetrieveResponse>"#;

    #[test]
    fn normalizes_dc_record() {
        let parsed = WorldcatSruDcEngine::parse_response(DC_RESPONSE).unwrap();
        let (total, items) = WorldcatSruDcEngine::normalize_response(parsed);

        assert_eq!(total, Some(1808));
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.oclcnum.as_deref(), Some("34912804"));
        assert_eq!(item.unique_id.as_deref(), Some("34912804"));
        assert_eq!(item.title.as_deref(), Some("Anarchism and other essays"));
        assert_eq!(item.publisher.as_deref(), Some("Humanity Books"));
        assert_eq!(item.year.as_deref(), Some("1996"));
        assert_eq!(item.language_code.as_deref(), Some("eng"));
        assert_eq!(
            item.abstract_text.as_deref(),
            Some("An anthology of anarchist essays.")
        );
        assert_eq!(
            item.link.as_deref(),
            Some("https://worldcat.org/oclc/34912804")
        );
        assert_eq!(item.format, Some(ItemFormat::Book));
        assert_eq!(item.authors[0].last.as_deref(), Some("Goldman"));
        assert_eq!(
            item.custom_data.get("isbn"),
            Some(&serde_json::Value::String("9780391234567".to_string()))
        );
    }

    #[test]
    fn thesis_type_is_a_dissertation() {
        let format = WorldcatSruDcEngine::guess_format(
            &["text".to_string(), "Thesis/dissertation".to_string()],
            &[],
        );
        assert_eq!(format, ItemFormat::Dissertation);
    }

    #[test]
    fn diagnostics_become_a_message() {
        let body = r#"<searchRetrieveResponse>
          <numberOfRecords>0</numberOfRecords>
          <diagnostics>
            <diagnostic>
              <uri>info:srw/diagnostic/1/7</uri>
              <message>Mandatory parameter not supplied</message>
              <details>wskey</details>
            </diagnostic>
          </diagnostics>
        </searchRetrieveResponse>"#;

        let parsed = WorldcatSruDcEngine::parse_response(body).unwrap();
        let message = WorldcatSruDcEngine::diagnostic_message(&parsed).unwrap();
        assert_eq!(message, "Mandatory parameter not supplied (wskey)");
    }

    #[test]
    fn year_extraction_handles_freeform_dates() {
        assert_eq!(first_year("c1996.").as_deref(), Some("1996"));
        assert_eq!(first_year("[2004]").as_deref(), Some("2004"));
        assert_eq!(first_year("n.d."), None);
    }

    #[test]
    fn issn_shapes() {
        assert!(looks_like_issn("1533-290X"));
        assert!(looks_like_issn("15332902"));
        assert!(!looks_like_issn("9780391234567"));
        assert!(!looks_like_issn("10.1215/00382876"));
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let err = WorldcatSruDcEngine::new(WorldcatSruDcConfig::new(" ")).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn get_with_empty_identifier_fails_before_any_network_call() {
        let mut config = WorldcatSruDcConfig::new("key");
        config.base_url = Some("http://127.0.0.1:9/sru".to_string());
        let engine = WorldcatSruDcEngine::new(config).unwrap();

        let err = engine.get("   ").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidIdentifier(_)));
    }
}
