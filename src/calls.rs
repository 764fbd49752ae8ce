//! Outbound call placement and per-call lifecycle tracking.

use crate::error::AppError;
use crate::phone;
use crate::telephony::Telephony;
use crate::twilio_types::{render, CallStatus, DialAction, ResponseAction, SayAction};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Client-observable call state. `Connected` is entered as soon as the
/// provider accepts the call, not when the callee answers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CallPhase {
    Idle,
    Initiating,
    Connected,
    Completed,
    Failed,
}

impl CallPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallPhase::Completed | CallPhase::Failed)
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub call_id: String,
    pub hotel_name: String,
    pub to_number: String,
    pub from_number: String,
    pub status: CallPhase,
    pub provider_status: Option<CallStatus>,
    pub purpose: Option<String>,
    /// Every phase this session has been in, oldest first.
    pub history: Vec<CallPhase>,
    #[serde(skip)]
    pub created_at: Instant,
    /// Set when the session reaches a terminal phase.
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

impl CallSession {
    fn enter(&mut self, phase: CallPhase) -> bool {
        if self.status.is_terminal() || phase <= self.status {
            return false;
        }
        self.status = phase;
        self.history.push(phase);
        if phase.is_terminal() {
            self.finished_at = Some(Instant::now());
        }
        true
    }

    fn expired(&self, retention: Duration, max_age: Duration) -> bool {
        match self.finished_at {
            Some(finished) => finished.elapsed() >= retention,
            None => self.created_at.elapsed() >= max_age,
        }
    }

    /// Apply a provider status. Stale or out-of-order updates are ignored.
    pub fn advance(&mut self, status: CallStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if let Some(prev) = self.provider_status {
            if status.rank() <= prev.rank() {
                return false;
            }
        }
        self.provider_status = Some(status);
        self.enter(status.phase());
        true
    }
}

/// Finished calls stay queryable this long.
pub const FINISHED_RETENTION: Duration = Duration::from_secs(60 * 60);
/// Calls that never report a terminal status are dropped after this.
pub const MAX_SESSION_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Call sessions keyed by provider call id. Expired sessions are pruned
/// whenever the store is written to.
#[derive(Clone)]
pub struct CallStore {
    sessions: Arc<Mutex<HashMap<String, CallSession>>>,
    retention: Duration,
    max_age: Duration,
}

impl Default for CallStore {
    fn default() -> Self {
        Self::with_retention(FINISHED_RETENTION, MAX_SESSION_AGE)
    }
}

impl CallStore {
    pub fn with_retention(retention: Duration, max_age: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            retention,
            max_age,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CallSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(&self, sessions: &mut HashMap<String, CallSession>) {
        let before = sessions.len();
        sessions.retain(|_, s| !s.expired(self.retention, self.max_age));
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!(pruned, remaining = sessions.len(), "pruned call sessions");
        }
    }

    pub fn insert(&self, session: CallSession) {
        let mut sessions = self.lock();
        self.prune(&mut sessions);
        sessions.insert(session.call_id.clone(), session);
    }

    pub fn get(&self, call_id: &str) -> Option<CallSession> {
        self.lock().get(call_id).cloned()
    }

    /// Record a pushed provider status. Returns the session after the update,
    /// or `None` when the call id is unknown.
    pub fn record_status(&self, call_id: &str, status: CallStatus) -> Option<CallSession> {
        let mut sessions = self.lock();
        self.prune(&mut sessions);
        let session = sessions.get_mut(call_id)?;
        if !session.advance(status) {
            debug!(call_id=%call_id, status=%status.as_str(), current=?session.status, "ignoring stale call status");
        }
        Some(session.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCallRequest {
    #[serde(default)]
    pub hotel_name: String,
    /// Accepted as a JSON string or number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneField {
    Text(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<PhoneField>::deserialize(d)?.map(|field| match field {
        PhoneField::Text(text) => text,
        PhoneField::Number(number) => number.to_string(),
    }))
}

pub fn introduction_twiml(hotel_name: &str, number: &str) -> String {
    render(vec![
        ResponseAction::Say(SayAction {
            text: format!("Connecting you to {hotel_name}. Please wait."),
            ..Default::default()
        }),
        ResponseAction::Dial(DialAction {
            number: number.to_string(),
            ..Default::default()
        }),
    ])
}

/// Validate the destination, ask the provider to dial it, and start tracking the call.
pub async fn place_call(
    telephony: Option<&dyn Telephony>,
    store: &CallStore,
    request: PlaceCallRequest,
) -> Result<CallSession, AppError> {
    let raw = request
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(AppError::Validation("Phone number is required"))?;

    let to_number = phone::normalize(raw, &request.country);
    debug!(raw=%raw, formatted=%to_number, country=%request.country, "formatted number");
    if !phone::validate(&to_number) {
        return Err(AppError::Validation("Invalid phone number format"));
    }

    let telephony = telephony.ok_or_else(|| {
        warn!("call requested but Twilio is not configured");
        AppError::Configuration("Twilio credentials are not configured")
    })?;

    let mut session = CallSession {
        call_id: String::new(),
        hotel_name: request.hotel_name,
        to_number,
        from_number: String::new(),
        status: CallPhase::Idle,
        provider_status: None,
        purpose: request.purpose.filter(|p| !p.trim().is_empty()),
        history: vec![CallPhase::Idle],
        created_at: Instant::now(),
        finished_at: None,
    };
    session.enter(CallPhase::Initiating);

    let twiml = introduction_twiml(&session.hotel_name, &session.to_number);
    let placed = telephony.place_call(&session.to_number, &twiml).await?;

    session.call_id = placed.call_id;
    session.from_number = placed.from_number;
    session.enter(CallPhase::Connected);
    info!(
        call_id=%session.call_id,
        hotel=%session.hotel_name,
        city=%request.city,
        purpose=?session.purpose,
        "call placed"
    );
    store.insert(session.clone());
    Ok(session)
}
