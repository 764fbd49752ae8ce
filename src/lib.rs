pub mod bridge;
pub mod calls;
pub mod config;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod nominatim_types;
pub mod openai;
pub mod openai_types;
pub mod overpass_types;
pub mod phone;
pub mod places;
pub mod tasks;
pub mod telephony;
pub mod twilio_types;
pub mod types;

use crate::types::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub mod consts {
    pub const MIN_QUERY_LEN: usize = 2;
    pub const HOTEL_RESULT_LIMIT: usize = 10;
    pub const NOMINATIM_USER_AGENT: &str = "HotelFinder/1.0";
    pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
    pub const ASSISTANT_VOICE: &str = "Polly.Amy-Neural";
    pub const STATUS_CALLBACK_EVENTS: &[&str] = &["initiated", "ringing", "answered", "completed"];
}

pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/cities", get(handlers::cities))
        .route("/hotels", get(handlers::hotels))
        .route("/scrape-phone", post(handlers::scrape_phone))
        .route("/search", post(handlers::search_phone))
        .route("/call", post(handlers::call))
        .route(
            "/call-status",
            post(handlers::call_status_webhook).get(handlers::call_status_query),
        )
        .route("/voice-webhook", post(handlers::voice_webhook))
        .route("/websocket", get(handlers::ws_handler))
        .with_state(app_state)
}
