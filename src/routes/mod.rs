use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

pub mod content;
pub mod health;
pub mod surveys;

// Bulk uploads carry up to ten files of up to 100 MiB each.
const MAX_BODY_BYTES: usize = 1024 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let content_routes = Router::new()
        .route(
            "/",
            get(content::list_content).post(content::upload_content),
        )
        .route("/bulk", post(content::upload_content_bulk))
        .route("/stats", get(content::content_stats))
        .route("/search/:query", get(content::search_content))
        .route(
            "/:id",
            get(content::get_content)
                .put(content::update_content)
                .delete(content::delete_content),
        );

    let survey_routes = Router::new()
        .route(
            "/",
            get(surveys::list_surveys).post(surveys::create_survey),
        )
        .route("/dashboard/stats", get(surveys::dashboard_stats))
        .route("/search/:query", get(surveys::search_surveys))
        .route(
            "/:id",
            get(surveys::get_survey)
                .put(surveys::update_survey)
                .delete(surveys::delete_survey),
        )
        .route("/:id/launch", post(surveys::launch_survey))
        .route("/:id/close", post(surveys::close_survey))
        .route(
            "/:id/responses",
            get(surveys::list_responses).post(surveys::submit_response),
        )
        .route("/:id/stats", get(surveys::survey_stats))
        .route("/:id/export", get(surveys::export_survey));

    Router::new()
        .nest("/api/content", content_routes)
        .nest("/api/surveys", survey_routes)
        .route("/api/responses", get(surveys::list_all_responses))
        .route("/api/download/:id", get(content::download_content))
        .route("/api/health", get(health::health_check))
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
