pub mod rest;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::{path::Path, sync::Arc};

use crate::{gemini::GeminiClient, service::NoteService};

const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub notes: NoteService,
    pub gemini: GeminiClient,
}

pub fn router(state: Arc<AppState>, uploads_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/notes", post(rest::create_note))
        .route("/notes/all", get(rest::get_all_notes))
        .route(
            "/notes/{id}",
            get(rest::get_one_note)
                .put(rest::update_note)
                .delete(rest::delete_note),
        )
        .route("/api/notes/{id}/analyze", post(rest::analyze_note))
        .route(
            "/api/gemini/compare",
            post(rest::compare_images).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", rest::ApiDoc::openapi()))
        .with_state(state)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
