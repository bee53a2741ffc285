//! EBSCOhost search engine, speaking the EIT SearchService XML API.
//!
//! EBSCO's boolean query grammar is picky: parentheses, brackets, and
//! question marks are special characters the service rejects even inside
//! quoted phrases, and bare `and`/`or`/`not` words are operators unless
//! quoted. [`EbscoHostEngine::prepare_query`] rewrites arbitrary user text
//! into a grammar-safe `term AND term AND "phrase"` form before any field
//! wrapping or limiters are applied.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::engines::ebsco_format::{classify, FormatSignals};
use crate::engines::{presence, EngineCapabilities, EngineError, SearchEngine};
use crate::models::{
    Author, FailureInfo, Pagination, ResultItem, ResultSet, SearchQuery, SearchTerms,
    SemanticField, Sort,
};
use crate::utils::HttpClient;

const DEFAULT_BASE_URL: &str = "https://eit.ebscohost.com/Services/SearchService.asmx";

/// Configuration for an EBSCOhost engine instance.
#[derive(Debug, Clone)]
pub struct EbscoHostConfig {
    /// EIT profile id, injected as the `prof` parameter.
    pub profile_id: String,
    /// EIT profile password, injected as the `pwd` parameter.
    pub profile_password: String,
    /// Databases to search, e.g. `["a9h", "awn"]`. Overridable per call.
    pub databases: Vec<String>,
    /// Registry id override; defaults to `"ebsco_host"`.
    pub id: Option<String>,
    /// Service base override (tests, proxies).
    pub base_url: Option<String>,
}

impl EbscoHostConfig {
    pub fn new(
        profile_id: impl Into<String>,
        profile_password: impl Into<String>,
        databases: Vec<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            profile_password: profile_password.into(),
            databases,
            id: None,
            base_url: None,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.profile_id.trim().is_empty() {
            return Err(EngineError::Configuration(
                "ebsco_host requires a profile_id".to_string(),
            ));
        }
        if self.profile_password.trim().is_empty() {
            return Err(EngineError::Configuration(
                "ebsco_host requires a profile_password".to_string(),
            ));
        }
        Ok(())
    }
}

/// One database a profile may search, from the EIT Info endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub shortname: String,
    pub label: Option<String>,
}

/// EBSCOhost EIT adapter.
#[derive(Debug, Clone)]
pub struct EbscoHostEngine {
    config: EbscoHostConfig,
    search_url: Url,
    info_url: Url,
    client: Arc<HttpClient>,
}

impl EbscoHostEngine {
    pub fn new(config: EbscoHostConfig) -> Result<Self, EngineError> {
        Self::with_client(config, Arc::new(HttpClient::new()))
    }

    /// Construct with a caller-supplied HTTP client (tests share a client
    /// pointed at a local server).
    pub fn with_client(config: EbscoHostConfig, client: Arc<HttpClient>) -> Result<Self, EngineError> {
        config.validate()?;
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let search_url = Url::parse(&format!("{}/Search", base))
            .map_err(|e| EngineError::Configuration(format!("bad ebsco_host base_url: {}", e)))?;
        let info_url = Url::parse(&format!("{}/Info", base))
            .map_err(|e| EngineError::Configuration(format!("bad ebsco_host base_url: {}", e)))?;
        Ok(Self {
            config,
            search_url,
            info_url,
            client,
        })
    }

    /// Rewrite free text into EBSCO's boolean grammar.
    ///
    /// Splits on whitespace and `:` `.` `;` outside double-quoted phrases,
    /// keeps phrases intact, wraps reserved operator words appearing as
    /// literal terms in quotes, and joins everything with ` AND `.
    pub fn prepare_query(text: &str) -> String {
        let mut tokens: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut in_phrase = false;

        for ch in text.chars() {
            if in_phrase {
                current.push(ch);
                if ch == '"' {
                    tokens.push(std::mem::take(&mut current));
                    in_phrase = false;
                }
            } else if ch == '"' {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                current.push('"');
                in_phrase = true;
            } else if ch.is_whitespace() || matches!(ch, ':' | '.' | ';') {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }

        tokens
            .into_iter()
            .map(|token| {
                if matches!(token.to_ascii_lowercase().as_str(), "and" | "or" | "not") {
                    format!("\"{}\"", token)
                } else {
                    token
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    // EBSCO chokes on these even inside quoted phrases. Applied after
    // tokenizing, so phrase boundaries survive while the characters become
    // spaces.
    fn scrub_special_chars(text: &str) -> String {
        text.chars()
            .map(|ch| {
                if matches!(ch, '(' | ')' | '?' | '[' | ']') {
                    ' '
                } else {
                    ch
                }
            })
            .collect()
    }

    fn field_code(field: SemanticField) -> Option<&'static str> {
        match field {
            SemanticField::Title => Some("TI"),
            SemanticField::Author => Some("AU"),
            SemanticField::Subject => Some("SU"),
            SemanticField::Issn => Some("IS"),
            SemanticField::Isbn => Some("IB"),
            SemanticField::Volume => Some("VI"),
            SemanticField::Issue => Some("IP"),
            SemanticField::StartPage => Some("SP"),
            SemanticField::AccessionNumber => Some("AN"),
            SemanticField::AuthorAffiliation => Some("AF"),
            SemanticField::OclcNumber => None,
        }
    }

    /// The complete boolean query string, limiters included.
    pub fn compose_query(query: &SearchQuery) -> String {
        let mut composed = match &query.terms {
            SearchTerms::Keywords(text) => {
                let prepared = Self::scrub_special_chars(&Self::prepare_query(text));
                let code = query
                    .search_field
                    .clone()
                    .or_else(|| query.semantic_field.and_then(|f| Self::field_code(f).map(String::from)));
                match code {
                    Some(code) => format!("({} {})", code, prepared),
                    None => prepared,
                }
            }
            SearchTerms::Fields(fields) => {
                let mut clauses: Vec<String> = fields
                    .iter()
                    .filter_map(|(field, value)| {
                        Self::field_code(*field).map(|code| {
                            format!(
                                "({} {})",
                                code,
                                Self::scrub_special_chars(&Self::prepare_query(value))
                            )
                        })
                    })
                    .collect();
                clauses.sort();
                clauses.join(" AND ")
            }
        };

        if query.peer_reviewed_only {
            composed.push_str(" AND (RV Y)");
        }
        if query.pubyear_start.is_some() || query.pubyear_end.is_some() {
            composed.push_str(&format!(
                " AND (DT {}-{})",
                query.pubyear_start.as_deref().unwrap_or(""),
                query.pubyear_end.as_deref().unwrap_or("")
            ));
        }

        composed
    }

    /// The full outbound request URL for a query.
    pub fn query_url(&self, query: &SearchQuery) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("prof", &self.config.profile_id);
            pairs.append_pair("pwd", &self.config.profile_password);
            pairs.append_pair("query", &Self::compose_query(query));
            pairs.append_pair("startrec", &(query.start + 1).to_string());
            pairs.append_pair("numrec", &query.per_page.to_string());
            pairs.append_pair(
                "sort",
                match query.sort {
                    Sort::Relevance => "relevance",
                    Sort::DateDesc => "date",
                },
            );
            pairs.append_pair("format", "detailed");
            for db in query.databases.as_ref().unwrap_or(&self.config.databases) {
                pairs.append_pair("db", db);
            }
        }
        url
    }

    /// Databases this profile may search, from the EIT Info endpoint.
    pub async fn database_info(&self) -> Result<Vec<DatabaseInfo>, EngineError> {
        let mut url = self.info_url.clone();
        url.query_pairs_mut()
            .append_pair("prof", &self.config.profile_id)
            .append_pair("pwd", &self.config.profile_password);

        let body = self
            .client
            .get_text(&url)
            .await
            .map_err(|f| EngineError::Fetch(f.message))?;
        let parsed: EitInfoResponse = quick_xml::de::from_str(&body)?;
        if let Some(desc) = presence(parsed.error_description) {
            return Err(EngineError::Fetch(desc));
        }

        Ok(parsed
            .info
            .and_then(|i| i.db_info)
            .map(|d| d.dbs)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|db| {
                presence(db.short_name).map(|shortname| DatabaseInfo {
                    shortname,
                    label: presence(db.long_name),
                })
            })
            .collect())
    }

    fn parse_response(body: &str) -> Result<EitResponse, EngineError> {
        Ok(quick_xml::de::from_str(body)?)
    }

    fn normalize_record(rec: EitRec) -> ResultItem {
        let mut item = ResultItem::new();

        if let Some(header) = &rec.header {
            if let (Some(db), Some(an)) = (
                presence(header.short_db_name.clone()),
                presence(header.ui_term.clone()),
            ) {
                item.unique_id = Some(format!("{}:{}", db, an));
            }
        }

        let control = rec.control_info.unwrap_or_default();
        let art = control.article_info.unwrap_or_default();
        let journal = control.journal_info.unwrap_or_default();
        let publication = control.pub_info.unwrap_or_default();
        let book_title = control.book_info.and_then(|b| presence(b.btl));
        let article_title = art.tig.as_ref().and_then(|t| presence(t.atl.clone()));
        let journal_title = presence(journal.jtl);

        item.subtitle = art.tig.as_ref().and_then(|t| presence(t.subtl.clone()));

        // A book container only counts when the record has its own title
        // that differs from it; otherwise the book title IS the record.
        let in_book_container = match (&article_title, &book_title) {
            (Some(atl), Some(btl)) => atl != btl,
            _ => false,
        };

        item.title = article_title.clone().or_else(|| book_title.clone());
        item.source_title = if in_book_container {
            book_title.clone()
        } else {
            journal_title.clone()
        };

        item.authors = art
            .aug
            .map(|a| a.authors)
            .unwrap_or_default()
            .iter()
            .filter(|a| !a.trim().is_empty())
            .map(|a| Author::from_byline(a))
            .collect();

        item.year = publication.dt.and_then(|d| presence(d.year));
        item.publisher = presence(publication.publisher);
        item.volume = presence(publication.vid);
        item.issue = presence(publication.iid);

        item.start_page = presence(art.ppf.clone());
        // EIT reports a starting page and a page count rather than an end
        // page.
        if let (Some(start), Some(count)) = (
            item.start_page.as_deref().and_then(|p| p.parse::<u64>().ok()),
            presence(art.ppct.clone()).and_then(|c| c.parse::<u64>().ok()),
        ) {
            if count > 0 {
                item.end_page = Some((start + count - 1).to_string());
            }
        }

        item.doi = art
            .uis
            .iter()
            .find(|ui| ui.kind.as_deref() == Some("doi"))
            .and_then(|ui| presence(ui.value.clone()));

        // Some databases (RILM) put the ISSN in a <jid type="issn">
        // instead of <issn>.
        item.issn = presence(journal.issn).or_else(|| {
            journal
                .jids
                .iter()
                .find(|jid| jid.kind.as_deref() == Some("issn"))
                .and_then(|jid| presence(jid.value.clone()))
        });

        item.abstract_text = presence(art.ab);

        if let Some(language) = presence(control.language) {
            match language_code(&language) {
                Some(code) => item.language_code = Some(code.to_string()),
                None => {
                    item.custom_data
                        .insert("language".to_string(), serde_json::Value::String(language));
                }
            }
        }

        item.link = presence(rec.plink);

        let fulltext: Vec<String> = art
            .formats
            .map(|f| f.fmts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|f| presence(f.kind))
            .collect();
        if !fulltext.is_empty() {
            item.link_is_fulltext = true;
            item.custom_data.insert(
                "fulltext_formats".to_string(),
                serde_json::Value::Array(
                    fulltext.into_iter().map(serde_json::Value::String).collect(),
                ),
            );
        }

        let doctype = presence(art.doctype);
        let pubtype = presence(art.pubtype);
        let dissertation_note = art.diss_info.and_then(|d| presence(d.dissnote));
        item.format = Some(classify(&FormatSignals {
            doctype: doctype.as_deref(),
            pubtype: pubtype.as_deref(),
            dissertation_note: dissertation_note.as_deref(),
            in_book_container,
            in_journal: journal_title.is_some(),
            has_publisher: item.publisher.is_some(),
            has_year: item.year.is_some(),
        }));

        item
    }

    fn normalize_response(parsed: EitResponse) -> (Option<u64>, Vec<ResultItem>) {
        let results = match parsed.search_results {
            Some(results) => results,
            None => return (None, Vec::new()),
        };
        let total = results.statistics.and_then(|s| s.total_hits);
        let items = results
            .records
            .map(|r| r.recs)
            .unwrap_or_default()
            .into_iter()
            .map(Self::normalize_record)
            .collect();
        (total, items)
    }
}

#[async_trait]
impl SearchEngine for EbscoHostEngine {
    fn id(&self) -> &str {
        self.config.id.as_deref().unwrap_or("ebsco_host")
    }

    fn name(&self) -> &str {
        "EBSCOhost"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::SEARCH | EngineCapabilities::GET | EngineCapabilities::DATABASE_INFO
    }

    async fn search(&self, query: &SearchQuery) -> ResultSet {
        let pagination = Pagination::from_start(query.start, query.per_page);
        let url = self.query_url(query);

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

        if let Some(description) = presence(parsed.error_description.clone()) {
            tracing::warn!(engine = self.id(), error = %description, "backend reported an error");
            return ResultSet::failure(self.id(), pagination, FailureInfo::new(description));
        }

        let (total, items) = Self::normalize_response(parsed);
        ResultSet::success(self.id(), items, pagination).with_total(total)
    }

    async fn get(&self, identifier: &str) -> Result<ResultItem, EngineError> {
        let (database, accession) = identifier
            .split_once(':')
            .filter(|(db, an)| !db.trim().is_empty() && !an.trim().is_empty())
            .ok_or_else(|| {
                EngineError::InvalidIdentifier(format!(
                    "expected <database>:<accession_number>, got '{}'",
                    identifier
                ))
            })?;

        let query = SearchQuery::new(accession)
            .search_field("AN")
            .databases(vec![database.to_string()])
            .per_page(1);

        let url = self.query_url(&query);
        let body = self
            .client
            .get_text(&url)
            .await
            .map_err(|f| EngineError::Fetch(f.message))?;

        let parsed = Self::parse_response(&body)?;
        if let Some(description) = presence(parsed.error_description.clone()) {
            return Err(EngineError::Fetch(description));
        }

        let (_, items) = Self::normalize_response(parsed);
        items
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NotFound(identifier.to_string()))
    }
}

fn language_code(language: &str) -> Option<&'static str> {
    match language.trim().to_ascii_lowercase().as_str() {
        "english" => Some("en"),
        "spanish" | "castilian" => Some("es"),
        "french" => Some("fr"),
        "german" => Some("de"),
        "italian" => Some("it"),
        "portuguese" => Some("pt"),
        "dutch" => Some("nl"),
        "russian" => Some("ru"),
        "chinese" => Some("zh"),
        "japanese" => Some("ja"),
        "arabic" => Some("ar"),
        _ => None,
    }
}

// ---- EIT response schema ----

#[derive(Debug, Deserialize)]
struct EitResponse {
    #[serde(rename = "ErrorNumber")]
    #[allow(dead_code)]
    error_number: Option<String>,
    #[serde(rename = "ErrorDescription")]
    error_description: Option<String>,
    #[serde(rename = "SearchResults")]
    search_results: Option<EitSearchResults>,
}

#[derive(Debug, Deserialize)]
struct EitSearchResults {
    #[serde(rename = "Statistics")]
    statistics: Option<EitStatistics>,
    records: Option<EitRecords>,
}

#[derive(Debug, Deserialize)]
struct EitStatistics {
    #[serde(rename = "TotalHits")]
    total_hits: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EitRecords {
    #[serde(rename = "rec", default)]
    recs: Vec<EitRec>,
}

#[derive(Debug, Deserialize)]
struct EitRec {
    header: Option<EitHeader>,
    #[serde(rename = "controlInfo")]
    control_info: Option<EitControlInfo>,
    plink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitHeader {
    #[serde(rename = "@shortDbName")]
    short_db_name: Option<String>,
    #[serde(rename = "@uiTerm")]
    ui_term: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EitControlInfo {
    #[serde(rename = "bkinfo")]
    book_info: Option<EitBookInfo>,
    #[serde(rename = "jinfo")]
    journal_info: Option<EitJournalInfo>,
    #[serde(rename = "pubinfo")]
    pub_info: Option<EitPubInfo>,
    #[serde(rename = "artinfo")]
    article_info: Option<EitArticleInfo>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitBookInfo {
    btl: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EitJournalInfo {
    issn: Option<String>,
    #[serde(rename = "jid", default)]
    jids: Vec<EitJid>,
    jtl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitJid {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EitPubInfo {
    dt: Option<EitDate>,
    vid: Option<String>,
    iid: Option<String>,
    #[serde(rename = "pub")]
    publisher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitDate {
    #[serde(rename = "@year")]
    year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EitArticleInfo {
    #[serde(rename = "ui", default)]
    uis: Vec<EitUi>,
    ppf: Option<String>,
    ppct: Option<String>,
    tig: Option<EitTig>,
    aug: Option<EitAug>,
    ab: Option<String>,
    doctype: Option<String>,
    pubtype: Option<String>,
    #[serde(rename = "dissinfo")]
    diss_info: Option<EitDissInfo>,
    formats: Option<EitFormats>,
}

#[derive(Debug, Deserialize)]
struct EitUi {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitTig {
    atl: Option<String>,
    subtl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitAug {
    #[serde(rename = "au", default)]
    authors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EitDissInfo {
    dissnote: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EitFormats {
    #[serde(rename = "fmt", default)]
    fmts: Vec<EitFmt>,
}

#[derive(Debug, Deserialize)]
struct EitFmt {
    #[serde(rename = "@type")]
    kind: Option<String>,
}

// ---- EIT info schema ----

#[derive(Debug, Deserialize)]
struct EitInfoResponse {
    #[serde(rename = "ErrorDescription")]
    error_description: Option<String>,
    info: Option<EitInfo>,
}

#[derive(Debug, Deserialize)]
struct EitInfo {
    #[serde(rename = "dbInfo")]
    db_info: Option<EitDbInfo>,
}

#[derive(Debug, Deserialize)]
struct EitDbInfo {
    #[serde(rename = "db", default)]
    dbs: Vec<EitDb>,
}

#[derive(Debug, Deserialize)]
struct EitDb {
    #[serde(rename = "@shortName")]
    short_name: Option<String>,
    #[serde(rename = "@longName")]
    long_name: Option<String>,
}
