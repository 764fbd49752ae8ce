use crate::bridge::{run_turn, APOLOGY_ERROR, APOLOGY_NON_TEXT};
use crate::calls::{place_call, PlaceCallRequest};
use crate::consts::ASSISTANT_VOICE;
use crate::error::{handle_error, AppError};
use crate::places::{search_cities, search_hotels};
use crate::tasks::{answer_audio, receive_audio};
use crate::twilio_types::{
    render, CallStatus, ResponseAction, SayAction, SpeechPayload, StatusCallbackPayload,
};
use crate::types::{AppState, ThreadRef};

use axum::{
    extract::{ws::WebSocketUpgrade, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

#[derive(Deserialize, Debug, Default)]
pub struct CitySearchParams {
    pub query: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct HotelSearchParams {
    pub city: Option<String>,
    pub query: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PhoneLookupBody {
    pub hotel: Option<String>,
    pub city: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallStatusParams {
    pub call_sid: Option<String>,
}

fn xml(twiml: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/xml"),
    );
    (StatusCode::OK, headers, twiml).into_response()
}

fn thread_ref(query: Option<String>) -> ThreadRef {
    serde_urlencoded::from_str(query.as_deref().unwrap_or_default()).unwrap_or_default()
}

pub async fn health() -> &'static str {
    "hotel-dialer"
}

pub async fn cities(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<CitySearchParams>,
) -> impl IntoResponse {
    let query = params.query.unwrap_or_default();
    let cities = search_cities(app_state.places.as_ref(), &query).await;
    debug!(query=%query, found=cities.len(), "city search");
    Json(json!({ "cities": cities }))
}

pub async fn hotels(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HotelSearchParams>,
) -> impl IntoResponse {
    let city = params.city.unwrap_or_default();
    let query = params.query.unwrap_or_default();
    let hotels = search_hotels(app_state.places.as_ref(), &city, &query).await;
    debug!(city=%city, query=%query, found=hotels.len(), "hotel search");
    Json(json!({ "hotels": hotels }))
}

/// Scrape fallback. Always answers with `{phoneNumber}`, `null` on any failure.
pub async fn scrape_phone(State(app_state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let body = serde_json::from_str::<PhoneLookupBody>(&body).unwrap_or_else(|e| {
        warn!(error=%e, "malformed scrape-phone body");
        PhoneLookupBody::default()
    });
    let (Some(hotel), Some(city)) = (body.hotel, body.city) else {
        return Json(json!({ "phoneNumber": null }));
    };
    let phone = match app_state.phone_scraper.guess_phone(&hotel, &city).await {
        Ok(phone) => phone,
        Err(e) => {
            error!(error=%e, hotel=%hotel, "phone scraping failed");
            None
        }
    };
    Json(json!({ "phoneNumber": phone }))
}

/// Language model fallback.
pub async fn search_phone(State(app_state): State<Arc<AppState>>, body: String) -> Response {
    let body = serde_json::from_str::<PhoneLookupBody>(&body).unwrap_or_default();
    let hotel = body.hotel.filter(|h| !h.trim().is_empty());
    let city = body.city.filter(|c| !c.trim().is_empty());
    let (Some(hotel), Some(city)) = (hotel, city) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "City and hotel name are required" })),
        )
            .into_response();
    };

    match app_state.phone_oracle.guess_phone(&hotel, &city).await {
        Ok(Some(phone)) => Json(json!({ "phoneNumber": phone })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Could not find phone number" })),
        )
            .into_response(),
        Err(e) => {
            error!(error=%e, hotel=%hotel, city=%city, "assistant phone search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to search hotel" })),
            )
                .into_response()
        }
    }
}

pub async fn call(State(app_state): State<Arc<AppState>>, body: String) -> Response {
    let request = match serde_json::from_str::<PlaceCallRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error=%e, "malformed call request");
            return AppError::Validation("Malformed call request").into_response();
        }
    };
    match place_call(app_state.telephony.as_deref(), &app_state.calls, request).await {
        Ok(session) => Json(json!({
            "success": true,
            "callId": session.call_id,
        }))
        .into_response(),
        Err(e) => {
            handle_error(&e);
            e.into_response()
        }
    }
}

/// Twilio status callback.
pub async fn call_status_webhook(
    State(app_state): State<Arc<AppState>>,
    body: String,
) -> Response {
    trace!(body=%body, "status callback body");
    let payload = match serde_urlencoded::from_str::<StatusCallbackPayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error=%e, "failed to deserialize Twilio status callback");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false })),
            )
                .into_response();
        }
    };
    info!(call_sid=%payload.call_sid, status=%payload.call_status, "call status");

    match payload.call_status.parse::<CallStatus>() {
        Ok(status) => match app_state.calls.record_status(&payload.call_sid, status) {
            Some(session) => debug!(call_sid=%payload.call_sid, phase=?session.status, "call status recorded"),
            None => warn!(call_sid=%payload.call_sid, "status for unknown call"),
        },
        Err(_) => warn!(status=%payload.call_status, "unrecognised call status"),
    }

    Json(json!({
        "success": true,
        "status": payload.call_status,
    }))
    .into_response()
}

pub async fn call_status_query(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<CallStatusParams>,
) -> Response {
    let Some(call_sid) = params.call_sid.filter(|s| !s.is_empty()) else {
        return AppError::Validation("callSid is required").into_response();
    };
    match app_state.calls.get(&call_sid) {
        Some(session) => Json(json!({
            "success": true,
            "callId": session.call_id,
            "status": session.status,
            "providerStatus": session.provider_status,
        }))
        .into_response(),
        None => AppError::NotFound("Unknown call").into_response(),
    }
}

/// Text turn: Twilio posts the recognised speech, we answer with TwiML.
/// Every path yields valid TwiML so the call flow never breaks.
pub async fn voice_webhook(
    State(app_state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    let thread = thread_ref(query);
    let speech = serde_urlencoded::from_str::<SpeechPayload>(&body).unwrap_or_else(|e| {
        warn!(error=%e, "failed to deserialize speech payload");
        SpeechPayload::default()
    });

    let result = match thread.ids() {
        Some((assistant_id, thread_id)) => {
            let utterance = speech.speech_result.unwrap_or_default();
            debug!(call_sid=?speech.call_sid, utterance=%utterance, "caller said");
            run_turn(
                app_state.assistant.as_ref(),
                assistant_id,
                thread_id,
                &utterance,
                app_state.poll_policy,
                &CancellationToken::new(),
            )
            .await
        }
        None => Err(AppError::Validation("Missing assistant or thread ID")),
    };

    let say = match result {
        Ok(Some(text)) => SayAction {
            text,
            voice: Some(ASSISTANT_VOICE.to_string()),
            ..Default::default()
        },
        Ok(None) => SayAction {
            text: APOLOGY_NON_TEXT.to_string(),
            voice: Some(ASSISTANT_VOICE.to_string()),
            ..Default::default()
        },
        Err(e) => {
            handle_error(&e);
            SayAction {
                text: APOLOGY_ERROR.to_string(),
                ..Default::default()
            }
        }
    };
    let twiml = render(vec![ResponseAction::Say(say)]);
    trace!("twiml: '{}'", twiml);
    xml(twiml)
}

/// Audio turn over a websocket: binary frames in, JSON replies out.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let thread = thread_ref(query);
    let Some((assistant_id, thread_id)) = thread
        .ids()
        .map(|(a, t)| (a.to_string(), t.to_string()))
    else {
        return (StatusCode::BAD_REQUEST, "Missing parameters").into_response();
    };

    ws.on_upgrade(move |socket| async move {
        info!(thread_id=%thread_id, "voice stream opened");
        let (sink, stream) = socket.split();
        let (audio_sink, audio_stream) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let (received, answered) = tokio::join!(
            receive_audio(stream, audio_sink, cancel.clone()),
            answer_audio(audio_stream, sink, assistant_id, thread_id, app_state, cancel),
        );
        for res in [received, answered] {
            if let Err(e) = res {
                handle_error(&e);
            }
        }
        info!("voice stream closed");
    })
}
