//! Fan one query out across every configured engine and fan the results
//! back in.
//!
//! Engines are configured from the environment; any engine whose
//! credentials are missing is skipped:
//!
//! - `EBSCO_PROFILE_ID`, `EBSCO_PROFILE_PASSWORD`, `EBSCO_DATABASES`
//!   (comma-separated, defaults to `a9h`)
//! - `WORLDCAT_API_KEY`
//! - `JOURNAL_TOCS_EMAIL` (searches treat the query as an ISSN)

use std::env;
use std::sync::Arc;

use bibsearch::engines::{
    EbscoHostConfig, EbscoHostEngine, EngineRegistry, JournalTocsConfig, JournalTocsEngine,
    WorldcatSruDcConfig, WorldcatSruDcEngine,
};
use bibsearch::models::SearchQuery;
use bibsearch::SearchEngine;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bibsearch=debug".into()),
        )
        .init();

    let mut registry = EngineRegistry::new();

    if let (Ok(profile), Ok(password)) = (
        env::var("EBSCO_PROFILE_ID"),
        env::var("EBSCO_PROFILE_PASSWORD"),
    ) {
        let databases = env::var("EBSCO_DATABASES")
            .unwrap_or_else(|_| "a9h".to_string())
            .split(',')
            .map(|db| db.trim().to_string())
            .collect();
        let engine = EbscoHostEngine::new(EbscoHostConfig::new(profile, password, databases))
            .expect("valid EBSCO configuration");
        registry.register(Arc::new(engine));
    }

    if let Ok(api_key) = env::var("WORLDCAT_API_KEY") {
        let engine = WorldcatSruDcEngine::new(WorldcatSruDcConfig::new(api_key))
            .expect("valid WorldCat configuration");
        registry.register(Arc::new(engine));
    }

    if let Ok(email) = env::var("JOURNAL_TOCS_EMAIL") {
        let engine = JournalTocsEngine::new(JournalTocsConfig::new(email))
            .expect("valid JournalTOCs configuration");
        registry.register(Arc::new(engine));
    }

    if registry.is_empty() {
        eprintln!("no engines configured; set EBSCO_*, WORLDCAT_API_KEY, or JOURNAL_TOCS_EMAIL");
        std::process::exit(1);
    }

    let terms = env::args().skip(1).collect::<Vec<_>>().join(" ");
    let terms = if terms.is_empty() {
        "climate adaptation".to_string()
    } else {
        terms
    };
    let query = SearchQuery::new(terms).per_page(5);

    // One task per engine; each fans in independently.
    let handles: Vec<_> = registry
        .searchable()
        .into_iter()
        .cloned()
        .map(|engine| {
            let query = query.clone();
            tokio::spawn(async move { engine.search(&query).await })
        })
        .collect();

    for handle in handles {
        let results = handle.await.expect("search task panicked");
        if results.failed {
            println!(
                "[{}] FAILED: {}",
                results.engine_id,
                results
                    .error
                    .as_ref()
                    .map(|e| e.error_info.as_str())
                    .unwrap_or("unknown")
            );
            continue;
        }

        println!(
            "[{}] {} of {} result(s):",
            results.engine_id,
            results.len(),
            results
                .total_items
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        for item in &results.items {
            println!(
                "  - {} [{}] ({})",
                item.title.as_deref().unwrap_or("(untitled)"),
                item.format
                    .as_ref()
                    .map(|f| f.label())
                    .unwrap_or("unknown format"),
                item.year.as_deref().unwrap_or("n.d.")
            );
        }
    }
}
