use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use guidex_core::acronym::{AcronymError, AcronymMatch, AcronymMatcher};
use guidex_core::model::RecordId;
use guidex_core::reload::{ChangeSignal, SharedIndex};
use guidex_core::search::MatchKind;

pub mod catalog;
pub mod loader;

use catalog::Catalog;
use loader::FileWatch;

const RECENT_UPDATE_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub index: SharedIndex,
    pub catalog: Arc<Catalog>,
    pub acronyms: Arc<AcronymMatcher>,
    pub watch: Arc<FileWatch>,
    pub change: Arc<ChangeSignal>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Serialize)]
pub struct SearchMatch {
    pub main_folder: String,
    pub sub_folder: String,
    pub document_type: String,
    pub document_type_identification_rules: String,
    pub supporting_information: String,
    pub match_type: MatchKind,
    pub score: f32,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub exact: bool,
    pub message: String,
    pub matches: Vec<SearchMatch>,
    /// Omitted entirely on the no-query early return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acronym_matches: Option<Vec<AcronymMatch>>,
}

#[derive(Serialize)]
pub struct UpdateEntry {
    pub main_folder: String,
    pub category: String,
    pub description: String,
    pub new: bool,
    pub date: time::Date,
}

#[derive(Deserialize)]
pub struct SuggestBody {
    #[serde(default)]
    pub acronym: String,
    #[serde(default)]
    pub expansion: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn error_reply(status: StatusCode, error: &str) -> ErrorReply {
    (status, Json(ErrorResponse { error: error.to_string() }))
}

pub fn build_app(state: AppState) -> Router {
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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/updates", get(updates_handler))
        .route("/api/acronyms/search", get(acronym_search_handler))
        .route("/api/acronyms/suggest", post(suggest_handler))
        .route("/api/acronyms/:id/approve", post(approve_handler))
        .route("/reload_data", post(reload_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// The watcher only flips the change flag; the rebuild itself runs here,
/// on the first request that observes the flag.
fn maybe_reload(state: &AppState) {
    if !state.change.take() {
        return;
    }
    tracing::info!("guide data changed, reloading before serving request");
    match loader::load_data(state.watch.path(), &state.catalog, &state.index) {
        Ok(message) => tracing::info!(%message, "reload complete"),
        Err(err) => tracing::error!(error = %err, "reload failed, keeping previous data"),
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ErrorReply> {
    maybe_reload(&state);
    let query = params.query.trim();
    tracing::info!(%query, "search request");

    if query.is_empty() {
        return Ok(Json(SearchResponse {
            exact: false,
            message: "No query provided.".to_string(),
            matches: Vec::new(),
            acronym_matches: None,
        }));
    }

    let matches = run_search(&state, query);
    let acronym_matches = state.acronyms.find_matches(query).map_err(|err| {
        tracing::error!(error = %err, "acronym lookup failed during search");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred")
    })?;

    let exact = matches.iter().any(|m| m.match_type.is_exact());
    let message = if matches.is_empty() { "No matches found." } else { "Showing results" };
    tracing::info!(matches = matches.len(), acronyms = acronym_matches.len(), "search served");

    Ok(Json(SearchResponse {
        exact,
        message: message.to_string(),
        matches,
        acronym_matches: Some(acronym_matches),
    }))
}

fn run_search(state: &AppState, query: &str) -> Vec<SearchMatch> {
    // Resolve local ids to authoritative ids under a single read guard,
    // then drop it before touching the catalog.
    let ranked: Vec<(RecordId, f32)> = {
        let index = state.index.read();
        index
            .search(query)
            .into_iter()
            .filter_map(|(local_id, score)| index.resolve(local_id).map(|doc| (doc.id, score)))
            .collect()
    };

    let ids: Vec<RecordId> = ranked.iter().map(|(id, _)| *id).collect();
    let records = state.catalog.subcategories_by_ids(&ids);

    let mut out = Vec::new();
    for (id, score) in ranked {
        // A reload between the index read and the catalog fetch can drop
        // a record; skip it rather than serve a half-resolved row.
        let Some(record) = records.get(&id) else { continue };
        let main_folder = state.catalog.category_name(record.category_id).unwrap_or_default();
        out.push(SearchMatch {
            main_folder,
            sub_folder: record.name.clone(),
            document_type: record.document_type.clone(),
            document_type_identification_rules: record.identification_rules.clone(),
            supporting_information: record.supporting_information.clone(),
            match_type: MatchKind::from_score(score),
            score,
        });
    }
    out
}

pub async fn updates_handler(State(state): State<AppState>) -> Json<Vec<UpdateEntry>> {
    maybe_reload(&state);
    let today = time::OffsetDateTime::now_utc().date();
    let entries: Vec<UpdateEntry> = state
        .catalog
        .recent_updates(RECENT_UPDATE_LIMIT)
        .into_iter()
        .map(|update| UpdateEntry {
            new: (today - update.date).whole_days() <= 1,
            main_folder: update.main_folder,
            category: update.category,
            description: update.description,
            date: update.date,
        })
        .collect();
    tracing::info!(count = entries.len(), "updates served");
    Json(entries)
}

pub async fn acronym_search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<AcronymMatch>>, ErrorReply> {
    let query = params.query.trim();
    tracing::info!(%query, "acronym search request");
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }
    match state.acronyms.find_matches(query) {
        Ok(matches) => Ok(Json(matches)),
        Err(err) => {
            tracing::error!(error = %err, "acronym search failed");
            Err(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while searching acronyms",
            ))
        }
    }
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    Json(body): Json<SuggestBody>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    let acronym = body.acronym.trim();
    let expansion = body.expansion.trim();
    if acronym.is_empty() || expansion.is_empty() {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "Acronym and expansion are required",
        ));
    }

    match state.acronyms.suggest(acronym, expansion, body.context.as_deref()) {
        Ok(message) => Ok(Json(MessageResponse { message: message.to_string() })),
        Err(AcronymError::Conflict) => Err(error_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while suggesting the acronym",
        )),
        Err(err) => {
            tracing::error!(error = %err, "acronym suggestion failed");
            Err(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred",
            ))
        }
    }
}

pub async fn approve_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    match state.acronyms.approve(id) {
        Ok(()) => Ok(Json(MessageResponse {
            message: "Acronym approval recorded".to_string(),
        })),
        Err(err) => {
            tracing::error!(error = %err, "acronym approval failed");
            Err(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred",
            ))
        }
    }
}

pub async fn reload_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>, ErrorReply> {
    match loader::load_data(state.watch.path(), &state.catalog, &state.index) {
        Ok(message) => Ok(Json(MessageResponse { message })),
        Err(err) => {
            tracing::error!(error = %err, "manual reload failed");
            Err(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred during data reload",
            ))
        }
    }
}
