use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, response::Html, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use slotdex_core::{Error as IndexError, IndexReader, SearchHit};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_RESULTS: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub index_dir: Arc<PathBuf>,
}

pub fn build_app(index_dir: PathBuf) -> Result<Router> {
    // Fail at startup rather than on the first request.
    let reader = IndexReader::open(&index_dir)?;
    tracing::info!(
        index = %index_dir.display(),
        slots = reader.table_size(),
        num_docs = reader.meta().map(|m| m.num_docs),
        "index opened"
    );
    let app_state = AppState { index_dir: Arc::new(index_dir) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/", get(page_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

/// Runs one query on a blocking thread with its own file handles.
async fn run_search(state: &AppState, query: String, k: usize) -> Result<Vec<SearchHit>, (StatusCode, String)> {
    let dir = state.index_dir.clone();
    let k = k.clamp(1, MAX_RESULTS);
    let outcome = tokio::task::spawn_blocking(move || -> slotdex_core::Result<Vec<SearchHit>> {
        IndexReader::open(dir.as_path())?.search(&query, k)
    })
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    outcome.map_err(|e| {
        tracing::error!(error = %e, "search failed");
        let status = match &e {
            IndexError::InvalidPath(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
    })
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let results = run_search(&state, params.q.clone(), params.k).await?;
    Ok(Json(SearchResponse {
        query: params.q,
        took_ms: start.elapsed().as_millis(),
        total_hits: results.len(),
        results,
    }))
}

pub async fn page_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, (StatusCode, String)> {
    let results = if params.q.trim().is_empty() {
        None
    } else {
        Some(run_search(&state, params.q.clone(), params.k).await?)
    };
    Ok(Html(render_page(&params.q, params.k, results.as_deref())))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Search form, followed by the results table when a query ran.
pub fn render_page(query: &str, k: usize, results: Option<&[SearchHit]>) -> String {
    let q = escape_html(query);
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head><title>slotdex search</title></head>\n<body>\n");
    let _ = write!(
        html,
        "<form action=\"/\" method=\"get\">\n\
         <input type=\"text\" name=\"q\" value=\"{q}\" placeholder=\"Search terms\">\n\
         <input type=\"number\" name=\"k\" min=\"1\" max=\"{MAX_RESULTS}\" value=\"{k}\">\n\
         <input type=\"submit\" value=\"Search\">\n</form>\n"
    );
    match results {
        None => html.push_str("<h2>Input search terms above</h2>\n"),
        Some([]) => {
            let _ = writeln!(html, "<h2>Search: {q}</h2>\n<p>No matches found</p>");
        }
        Some(hits) => {
            let _ = writeln!(html, "<h2>Search: {q}</h2>\n<table id=\"results\">");
            for h in hits {
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                    h.rank,
                    escape_html(&h.filename),
                    h.weight
                );
            }
            html.push_str("</table>\n");
        }
    }
    html.push_str("</body>\n</html>\n");
    html
}
