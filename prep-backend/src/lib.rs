//! HTTP API for the exam-prep app.
//!
//! Every route lives under `/api` and speaks JSON. Routes that act on behalf
//! of a learner need `Authorization: Bearer <jwt>`; the user row is created
//! on first sight. `saveExams` and `saveDataRating` are open.
//!
//! # Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `JWT_SECRET` | required |
//! | `PORT` | `8080` |
//! | `DATABASE_PATH` | `prep.sqlite3` |
//! | `ALLOWED_ORIGIN` | `https://cloud-practitioner.com` |
//! | `BASIC_ITEM_LIMIT` | `20` |
//! | `DEFAULT_TRIES` | `1` |
//! | `SEED_FILE` | unset; a JSON content bundle imported at startup |

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use tokio::signal::ctrl_c;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

use config::Config;
use db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Db, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors(&state.config.allowed_origin);

    Router::new()
        .route("/api/getQuestions", post(routes::get_questions))
        .route("/api/saveExams", post(routes::save_exams))
        .route("/api/updateTries", post(routes::update_tries))
        .route("/api/getExamHistory", get(routes::get_exam_history))
        .route("/api/getFlashcards", get(routes::get_flashcards))
        .route("/api/getLessons", get(routes::get_lessons))
        .route("/api/getUserLesson", get(routes::get_user_lesson))
        .route("/api/saveLessonProgress", post(routes::save_lesson_progress))
        .route("/api/resetLessonProgress", post(routes::reset_lesson_progress))
        .route("/api/saveDataRating", post(routes::save_data_rating))
        .layer(cors)
        .layer(CompressionLayer::new())
        .with_state(state)
}

fn cors(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60 * 24));

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            log::warn!("ALLOWED_ORIGIN {origin:?} is not a valid header value ({e}), CORS disabled");
            layer
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => log::error!("Failed to listen for Ctrl+C: {e}"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
