use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use linkrank_core::config::Config;
use linkrank_core::corpus::{DocCatalog, LinkPopularity};
use linkrank_core::persist::IndexReader;
use linkrank_core::query::{process, QueryOutcome};
use linkrank_core::rank::{score, top_k};
use linkrank_core::{CorpusError, DocId, IndexError, PostingSource};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_K: usize = 10;
pub const MAX_K: usize = 100_000;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("k must be an integer between 1 and {MAX_K}, got {0:?}")]
pub struct InvalidK(pub String);

/// Parse a requested result count, accepting `1..=MAX_K`.
pub fn parse_k(raw: &str) -> Result<usize, InvalidK> {
    match raw.trim().parse::<usize>() {
        Ok(k) if (1..=MAX_K).contains(&k) => Ok(k),
        _ => Err(InvalidK(raw.to_string())),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

impl SearchError {
    /// Whether rebuilding the index is the fix.
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, SearchError::Index(IndexError::Unavailable { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Documents containing at least one query term.
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

/// One immutable index generation plus the link counts and display fields it is
/// ranked and rendered with.
pub struct Searcher {
    config: Config,
    reader: IndexReader,
    links: LinkPopularity,
    catalog: DocCatalog,
}

impl Searcher {
    pub fn open(config: Config) -> Result<Self, SearchError> {
        let reader = IndexReader::open(&config.index)?;
        let links = LinkPopularity::load(&config.corpus)?;
        let catalog = DocCatalog::load(&config.corpus)?;
        tracing::info!(generation = reader.generation(), num_docs = reader.num_docs(), "loaded index");
        Ok(Self { config, reader, links, catalog })
    }

    pub fn generation(&self) -> &str { self.reader.generation() }

    pub fn config(&self) -> &Config { &self.config }

    pub fn search(&self, query: &str, k: usize) -> Result<SearchResponse, SearchError> {
        let processed = match process(&self.reader, query)? {
            QueryOutcome::Matched(q) => q,
            outcome => {
                tracing::debug!(?outcome, "no results");
                return Ok(SearchResponse { query: query.to_string(), total_hits: 0, results: vec![] });
            }
        };
        let scored = score(&processed, self.reader.num_docs(), &self.links)?;
        let total_hits = scored.len();
        let top = top_k(scored, k);

        let mut results = Vec::with_capacity(top.len());
        for (i, doc) in top.into_iter().enumerate() {
            let d = self.catalog.get(doc.doc_id)?;
            results.push(SearchHit {
                rank: i + 1,
                doc_id: doc.doc_id,
                score: doc.score,
                title: d.title.clone(),
                url: d.url.clone(),
            });
        }
        Ok(SearchResponse { query: query.to_string(), total_hits, results })
    }
}

/// Plain-text rendering of ranked hits, one block per result.
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found\n".to_string();
    }
    let mut out = String::new();
    for hit in hits {
        let _ = writeln!(out, "{}. Doc_ID = {} ; Score = {}", hit.rank, hit.doc_id, hit.score);
        let _ = writeln!(out, "Title = {}", hit.title);
        let _ = writeln!(out, "URL = {}", hit.url);
    }
    out
}

// --- HTTP service ---

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub searcher: Arc<RwLock<Arc<Searcher>>>,
    pub admin_token: Option<String>,
}

pub fn build_app(config: Config) -> Result<Router> {
    build_app_with_token(config, std::env::var("ADMIN_TOKEN").ok())
}

/// Same as [`build_app`], with the reload token passed in rather than read from `ADMIN_TOKEN`.
pub fn build_app_with_token(config: Config, admin_token: Option<String>) -> Result<Router> {
    let searcher = Searcher::open(config)?;
    let app_state = AppState { searcher: Arc::new(RwLock::new(Arc::new(searcher))), admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let k = match params.k.as_deref().map(parse_k) {
        None => DEFAULT_K,
        Some(Ok(k)) => k,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "falling back to k = {DEFAULT_K}");
            DEFAULT_K
        }
    };
    // Requests keep the generation they started with even if a reload lands meanwhile.
    let searcher = state.searcher.read().clone();
    let response = tokio::task::spawn_blocking(move || searcher.search(&params.q, k))
        .await
        .map_err(internal)?
        .map_err(internal)?;
    Ok(Json(response))
}

/// Reopen whatever generation `CURRENT` now names and swap it in.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let config = state.searcher.read().config().clone();
    let fresh = tokio::task::spawn_blocking(move || Searcher::open(config))
        .await
        .map_err(internal)?
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    let generation = fresh.generation().to_string();
    *state.searcher.write() = Arc::new(fresh);
    tracing::info!(%generation, "reloaded index");
    Ok(Json(serde_json::json!({ "generation": generation })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
