#![allow(dead_code)]

use async_trait::async_trait;
use hotel_dialer::bridge::{Assistant, PollPolicy};
use hotel_dialer::calls::CallStore;
use hotel_dialer::discovery::PhoneGuesser;
use hotel_dialer::error::AppError;
use hotel_dialer::nominatim_types::NominatimPlace;
use hotel_dialer::openai_types::{MessageContent, Run, RunStatus, TextContent, ThreadMessage};
use hotel_dialer::overpass_types::{BoundingBox, OverpassElement};
use hotel_dialer::places::PlaceLookup;
use hotel_dialer::telephony::{PlacedCall, Telephony};
use hotel_dialer::types::AppState;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn paris() -> NominatimPlace {
    serde_json::from_value(serde_json::json!({
        "place_id": 88066702,
        "display_name": "Paris, Île-de-France, France métropolitaine, France",
        "type": "administrative",
        "boundingbox": ["48.8155755", "48.9021560", "2.2241220", "2.4697602"],
        "lat": "48.8534951",
        "lon": "2.3483915",
        "address": {"city": "Paris", "state": "Île-de-France", "country": "France"}
    }))
    .unwrap()
}

#[derive(Default)]
pub struct FakePlaces {
    pub cities: Vec<NominatimPlace>,
    pub elements: Vec<OverpassElement>,
    pub city_calls: AtomicUsize,
    pub place_calls: AtomicUsize,
}

impl FakePlaces {
    pub fn lookups(&self) -> usize {
        self.city_calls.load(Ordering::SeqCst) + self.place_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceLookup for FakePlaces {
    async fn lookup_city(&self, _query: &str, limit: usize) -> Result<Vec<NominatimPlace>, AppError> {
        self.city_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cities.iter().take(limit).cloned().collect())
    }

    async fn lookup_places(
        &self,
        _bbox: BoundingBox,
        _query: &str,
    ) -> Result<Vec<OverpassElement>, AppError> {
        self.place_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.elements.clone())
    }
}

/// Accepts every call unless an error is scripted, and remembers what it dialled.
#[derive(Default)]
pub struct RecordingTelephony {
    pub dialled: Mutex<Vec<(String, String)>>,
    pub reject_with: Option<(i64, u16, &'static str)>,
}

impl RecordingTelephony {
    pub fn calls(&self) -> usize {
        self.dialled.lock().unwrap().len()
    }
}

#[async_trait]
impl Telephony for RecordingTelephony {
    async fn place_call(&self, to: &str, twiml: &str) -> Result<PlacedCall, AppError> {
        self.dialled
            .lock()
            .unwrap()
            .push((to.to_string(), twiml.to_string()));
        if let Some((code, status, message)) = self.reject_with {
            return Err(AppError::Provider {
                provider: "Twilio",
                code: Some(code),
                status: Some(status),
                message: message.to_string(),
            });
        }
        Ok(PlacedCall {
            call_id: "CA0123456789abcdef".to_string(),
            from_number: "+15550001111".to_string(),
        })
    }
}

pub struct FixedGuess(pub Result<Option<String>, &'static str>);

#[async_trait]
impl PhoneGuesser for FixedGuess {
    async fn guess_phone(&self, _hotel: &str, _city: &str) -> Result<Option<String>, AppError> {
        self.0
            .clone()
            .map_err(|e| AppError::Unknown(e.to_string()))
    }
}

/// Assistant whose runs settle on a fixed status and whose transcripts are canned.
pub struct ScriptedAssistant {
    pub settles_on: RunStatus,
    pub reply: Option<String>,
    pub transcript: String,
    pub polls: AtomicUsize,
    pub added: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn replying(text: &str) -> Self {
        Self {
            settles_on: RunStatus::Completed,
            reply: Some(text.to_string()),
            transcript: "Do you have a room tonight?".to_string(),
            polls: AtomicUsize::new(0),
            added: Mutex::new(vec![]),
        }
    }

    pub fn stuck() -> Self {
        Self {
            settles_on: RunStatus::InProgress,
            ..Self::replying("never sent")
        }
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    async fn add_user_message(&self, _thread_id: &str, content: &str) -> Result<(), AppError> {
        self.added.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run, AppError> {
        Ok(Run {
            id: "run_1".to_string(),
            status: RunStatus::Queued,
        })
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<Run, AppError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(Run {
            id: run_id.to_string(),
            status: self.settles_on,
        })
    }

    async fn latest_message(&self, _thread_id: &str) -> Result<Option<ThreadMessage>, AppError> {
        Ok(self.reply.as_ref().map(|text| ThreadMessage {
            id: "msg_1".to_string(),
            role: "assistant".to_string(),
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: text.clone(),
                },
            }],
        }))
    }

    async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, AppError> {
        Ok(self.transcript.clone())
    }
}

pub struct Fakes {
    pub places: Arc<FakePlaces>,
    pub telephony: Option<Arc<RecordingTelephony>>,
    pub assistant: Arc<ScriptedAssistant>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            places: Arc::new(FakePlaces::default()),
            telephony: Some(Arc::new(RecordingTelephony::default())),
            assistant: Arc::new(ScriptedAssistant::replying("We have a double room available.")),
        }
    }
}

pub fn fast_polls() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        deadline: Duration::from_millis(300),
    }
}

pub fn app_state(fakes: &Fakes) -> AppState {
    AppState {
        places: fakes.places.clone(),
        phone_scraper: Arc::new(FixedGuess(Ok(Some("+33 1 23 45 67 89".to_string())))),
        phone_oracle: Arc::new(FixedGuess(Ok(None))),
        telephony: fakes
            .telephony
            .clone()
            .map(|t| t as Arc<dyn Telephony>),
        assistant: fakes.assistant.clone(),
        calls: CallStore::default(),
        poll_policy: fast_polls(),
    }
}

pub fn state(fakes: &Fakes) -> Arc<AppState> {
    Arc::new(app_state(fakes))
}
