//! HTTP-level integration tests, driving whole engines against a local
//! mock server: query translation on the way out, normalization on the way
//! back, and the search/get failure asymmetry.

use std::sync::Arc;

use bibsearch::engines::{
    EbscoHostConfig, EbscoHostEngine, EngineError, EngineRegistry, MockEngine,
    WorldcatSruDcConfig, WorldcatSruDcEngine,
};
use bibsearch::models::{FailureInfo, Pagination, ResultItem, ResultSet, SearchQuery};
use bibsearch::SearchEngine;

const EBSCO_ARTICLE_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<searchResponse>
  <SearchResults>
    <Statistics><TotalHits>1</TotalHits></Statistics>
    <records>
      <rec>
        <header shortDbName="a9h" uiTerm="90211158"/>
        <controlInfo>
          <jinfo><issn>00382876</issn><jtl>South Atlantic Quarterly</jtl></jinfo>
          <pubinfo><dt year="2013"/><vid>112</vid><iid>4</iid></pubinfo>
          <artinfo>
            <ui type="doi">10.1215/00382876-2345315</ui>
            <tig><atl>Reflections on the History of Debt Resistance</atl></tig>
            <aug><au>Caffentzis, George</au></aug>
            <doctype>Article</doctype>
            <pubtype>Academic Journal</pubtype>
          </artinfo>
          <language>English</language>
        </controlInfo>
        <plink>https://search.ebscohost.com/login.aspx?direct=true</plink>
      </rec>
    </records>
  </SearchResults>
</searchResponse>"#;

const EBSCO_ERROR_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<searchResponse>
  <ErrorNumber>109</ErrorNumber>
  <ErrorDescription>Profile ID is not valid</ErrorDescription>
</searchResponse>"#;

fn ebsco_engine(base_url: &str) -> EbscoHostEngine {
    let mut config = EbscoHostConfig::new("DUMMY_PROFILE", "TOPSECRET_PWD", vec!["a9h".to_string()]);
    config.base_url = Some(base_url.to_string());
    EbscoHostEngine::new(config).unwrap()
}

#[tokio::test]
async fn ebsco_search_get_round_trip() {
    let mut server = mockito::Server::new_async().await;

    let _search = server
        .mock("GET", "/Search")
        .match_query(mockito::Matcher::UrlEncoded("query".into(), "cancer".into()))
        .with_body(EBSCO_ARTICLE_BODY)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/Search")
        .match_query(mockito::Matcher::UrlEncoded(
            "query".into(),
            "(AN 90211158)".into(),
        ))
        .with_body(EBSCO_ARTICLE_BODY)
        .create_async()
        .await;

    let engine = ebsco_engine(&server.url());

    let results = engine.search(&SearchQuery::new("cancer")).await;
    assert!(!results.failed);
    assert_eq!(results.total_items, Some(1));

    let unique_id = results.first().unwrap().unique_id.clone().unwrap();
    assert_eq!(unique_id, "a9h:90211158");
    // db name, colon, accession number
    assert_eq!(unique_id.matches(':').count(), 1);

    let item = engine.get(&unique_id).await.unwrap();
    assert_eq!(item.unique_id.as_deref(), Some("a9h:90211158"));
}

#[tokio::test]
async fn ebsco_backend_error_fails_the_result_set_without_leaking_credentials() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/Search")
        .with_body(EBSCO_ERROR_BODY)
        .create_async()
        .await;

    let engine = ebsco_engine(&server.url());
    let results = engine.search(&SearchQuery::new("cancer")).await;

    assert!(results.failed);
    assert!(results.is_empty());
    let error = results.error.unwrap();
    assert_eq!(error.error_info, "Profile ID is not valid");
    assert!(!error.error_info.contains("TOPSECRET_PWD"));
}

#[tokio::test]
async fn ebsco_http_error_fails_the_result_set_with_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/Search")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let engine = ebsco_engine(&server.url());
    let results = engine.search(&SearchQuery::new("cancer")).await;

    assert!(results.failed);
    let error = results.error.unwrap();
    assert_eq!(error.status, Some(500));
    assert!(!error.error_info.contains("TOPSECRET_PWD"));
}

#[tokio::test]
async fn ebsco_get_rejects_malformed_id_without_touching_the_network() {
    let mut server = mockito::Server::new_async().await;
    let never_called = server
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let engine = ebsco_engine(&server.url());
    let err = engine.get("no_separator_in_here").await.unwrap_err();

    assert!(matches!(err, EngineError::InvalidIdentifier(_)));
    never_called.assert_async().await;
}

#[tokio::test]
async fn ebsco_get_zero_hits_is_not_found() {
    let empty = r#"<searchResponse><SearchResults>
        <Statistics><TotalHits>0</TotalHits></Statistics>
        <records/>
      </SearchResults></searchResponse>"#;

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/Search")
        .with_body(empty)
        .create_async()
        .await;

    let engine = ebsco_engine(&server.url());
    let err = engine.get("a9h:bar").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

const WORLDCAT_RECORD_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
  <numberOfRecords>1</numberOfRecords>
  <records>
    <record>
      <recordData>
        <oclcdcs>
          <dc:creator xmlns:dc="http://purl.org/dc/elements/1.1/">Goldman, Emma</dc:creator>
          <dc:date xmlns:dc="http://purl.org/dc/elements/1.1/">c1996.</dc:date>
          <dc:publisher xmlns:dc="http://purl.org/dc/elements/1.1/">Humanity Books</dc:publisher>
          <dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">Anarchism and other essays</dc:title>
          <oclcterms:recordIdentifier xmlns:oclcterms="http://purl.oclc.org/oclc/terms/">34912804</oclcterms:recordIdentifier>
        </oclcdcs>
      </recordData>
    </record>
  </records>
</searchRetrieveResponse>"#;

const WORLDCAT_EMPTY_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
  <numberOfRecords>0</numberOfRecords>
  <records/>
</searchRetrieveResponse>"#;

fn worldcat_engine(base_url: &str) -> WorldcatSruDcEngine {
    let mut config = WorldcatSruDcConfig::new("DUMMY_API_KEY");
    config.base_url = Some(format!("{}/sru", base_url));
    WorldcatSruDcEngine::new(config).unwrap()
}

#[tokio::test]
async fn worldcat_clamps_out_of_range_pagination() {
    let mut server = mockito::Server::new_async().await;
    let clamped = server
        .mock("GET", "/sru")
        .match_query(mockito::Matcher::UrlEncoded(
            "startRecord".into(),
            "9999".into(),
        ))
        .with_body(WORLDCAT_EMPTY_BODY)
        .create_async()
        .await;

    let engine = worldcat_engine(&server.url());
    let results = engine
        .search(&SearchQuery::new("cancer").start(100_000).per_page(10))
        .await;

    assert!(!results.failed);
    assert_eq!(results.pagination.start_record, 9999);
    assert_eq!(results.pagination.current_page, 1000);
    clamped.assert_async().await;
}

#[tokio::test]
async fn worldcat_get_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/sru")
        .match_query(mockito::Matcher::UrlEncoded(
            "query".into(),
            "srw.no = \"34912804\"".into(),
        ))
        .with_body(WORLDCAT_RECORD_BODY)
        .create_async()
        .await;

    let engine = worldcat_engine(&server.url());
    let item = engine.get("34912804").await.unwrap();

    assert_eq!(item.unique_id.as_deref(), Some("34912804"));
    assert_eq!(item.oclcnum.as_deref(), Some("34912804"));
    assert_eq!(item.title.as_deref(), Some("Anarchism and other essays"));
}

#[tokio::test]
async fn worldcat_get_zero_hits_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/sru")
        .with_body(WORLDCAT_EMPTY_BODY)
        .create_async()
        .await;

    let engine = worldcat_engine(&server.url());
    let err = engine.get("NOT EXISTING").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn worldcat_diagnostics_fail_the_result_set() {
    let body = r#"<searchRetrieveResponse>
      <numberOfRecords>0</numberOfRecords>
      <diagnostics><diagnostic>
        <message>Query syntax error</message>
      </diagnostic></diagnostics>
    </searchRetrieveResponse>"#;

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/sru")
        .with_body(body)
        .create_async()
        .await;

    let engine = worldcat_engine(&server.url());
    let results = engine.search(&SearchQuery::new("((")).await;

    assert!(results.failed);
    assert_eq!(results.error.unwrap().error_info, "Query syntax error");
}

#[tokio::test]
async fn fan_out_across_registry_engines() {
    let mut registry = EngineRegistry::new();

    let fast = MockEngine::new("fast");
    fast.set_search_response(
        ResultSet::success(
            "fast",
            vec![ResultItem {
                title: Some("Fast hit".to_string()),
                ..ResultItem::default()
            }],
            Pagination::from_start(0, 10),
        )
        .with_total(Some(1)),
    );
    registry.register(Arc::new(fast));

    let broken = MockEngine::new("broken");
    broken.set_search_response(ResultSet::failure(
        "broken",
        Pagination::from_start(0, 10),
        FailureInfo::new("backend melted"),
    ));
    registry.register(Arc::new(broken));

    let query = SearchQuery::new("anything");
    let handles: Vec<_> = registry
        .searchable()
        .into_iter()
        .cloned()
        .map(|engine| {
            let query = query.clone();
            tokio::spawn(async move { engine.search(&query).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    // Every engine produced a set; failure is data, not a panic or error.
    assert_eq!(outcomes.len(), 2);
    let ok = outcomes.iter().find(|r| !r.failed).unwrap();
    let failed = outcomes.iter().find(|r| r.failed).unwrap();
    assert_eq!(ok.engine_id, "fast");
    assert_eq!(ok.first().unwrap().title.as_deref(), Some("Fast hit"));
    assert_eq!(failed.engine_id, "broken");
    assert!(failed.is_empty());
}

#[tokio::test]
async fn ebsco_database_info_lists_profile_databases() {
    let body = r#"<infoResponse>
      <info>
        <dbInfo>
          <db shortName="a9h" longName="Academic Search Premier"/>
          <db shortName="awn" longName="AgeLine"/>
        </dbInfo>
      </info>
    </infoResponse>"#;

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/Info")
        .with_body(body)
        .create_async()
        .await;

    let engine = ebsco_engine(&server.url());
    let databases = engine.database_info().await.unwrap();

    assert_eq!(databases.len(), 2);
    assert!(databases
        .iter()
        .any(|db| db.shortname == "a9h" && db.label.as_deref() == Some("Academic Search Premier")));
}

#[tokio::test]
async fn journal_tocs_does_not_support_get() {
    use bibsearch::engines::{JournalTocsConfig, JournalTocsEngine};

    let engine = JournalTocsEngine::new(JournalTocsConfig::new("nobody@example.com")).unwrap();
    assert!(!engine.supports_get());

    let err = engine.get("anything").await.unwrap_err();
    assert!(matches!(err, EngineError::Unsupported));
}

#[test]
fn registry_lookup_failure_is_a_configuration_error() {
    let registry = EngineRegistry::new();
    let err = registry.get_required("ebsco_host").unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}
