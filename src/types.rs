use crate::bridge::{Assistant, PollPolicy};
use crate::calls::CallStore;
use crate::config::Config;
use crate::discovery::{ChatPhoneGuesser, PhoneGuesser, SearchPageScraper};
use crate::openai::OpenAIClient;
use crate::places::{OsmPlaces, PlaceLookup};
use crate::telephony::{Telephony, TwilioClient};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A municipality candidate returned by the geocoder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,
    pub country: String,
    pub region: String,
    pub id: String,
    /// south, north, west, east
    pub boundingbox: [String; 4],
    pub lat: String,
    pub lon: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HotelLocation {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A lodging establishment inside a city's bounding box.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hotel {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub stars: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub rating: Option<f64>,
    pub rooms: Option<u32>,
    pub id: String,
    pub location: HotelLocation,
}

/// Identifies a conversation owned by the hosted assistant service.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRef {
    pub assistant_id: Option<String>,
    pub thread_id: Option<String>,
}

impl ThreadRef {
    /// Both ids, if the caller supplied non-empty values for each.
    pub fn ids(&self) -> Option<(&str, &str)> {
        match (self.assistant_id.as_deref(), self.thread_id.as_deref()) {
            (Some(a), Some(t)) if !a.is_empty() && !t.is_empty() => Some((a, t)),
            _ => None,
        }
    }
}

pub struct AppState {
    pub places: Arc<dyn PlaceLookup>,
    /// Scrapes a public search results page.
    pub phone_scraper: Arc<dyn PhoneGuesser>,
    /// Asks a language model.
    pub phone_oracle: Arc<dyn PhoneGuesser>,
    /// `None` when Twilio credentials are not configured.
    pub telephony: Option<Arc<dyn Telephony>>,
    pub assistant: Arc<dyn Assistant>,
    pub calls: CallStore,
    pub poll_policy: PollPolicy,
}

impl AppState {
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        let openai = Arc::new(OpenAIClient::new(
            http_client.clone(),
            &config.openai_api_url,
            &config.openai_api_key,
        ));
        let telephony = config.telephony.as_ref().map(|t| {
            Arc::new(TwilioClient::new(http_client.clone(), &config.twilio_api_url, t))
                as Arc<dyn Telephony>
        });

        Self {
            places: Arc::new(OsmPlaces::new(
                http_client.clone(),
                &config.nominatim_url,
                &config.overpass_url,
            )),
            phone_scraper: Arc::new(SearchPageScraper::new(
                http_client,
                &config.search_engine_url,
            )),
            phone_oracle: Arc::new(ChatPhoneGuesser::new(
                openai.clone(),
                &config.openai_chat_model,
            )),
            telephony,
            assistant: openai,
            calls: CallStore::default(),
            poll_policy: PollPolicy {
                interval: config.assistant_poll_interval,
                deadline: config.assistant_run_timeout,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotel_serializes_with_wire_names() {
        let hotel = Hotel {
            name: "Hotel X".to_string(),
            address: "Rue de Rivoli 1, Paris".to_string(),
            phone: None,
            website: None,
            stars: Some(4.0),
            kind: "hotel".to_string(),
            rating: None,
            rooms: Some(80),
            id: "42".to_string(),
            location: HotelLocation {
                lat: Some(48.86),
                lon: None,
            },
        };
        let v = serde_json::to_value(&hotel).unwrap();
        assert_eq!(v["type"], "hotel");
        assert!(v["phone"].is_null());
        assert!(v.get("website").is_none());
        assert_eq!(v["location"]["lat"], 48.86);
    }

    #[test]
    fn thread_ref_requires_both_ids() {
        let t: ThreadRef =
            serde_urlencoded::from_str("assistantId=asst_1&threadId=thread_1").unwrap();
        assert_eq!(t.ids(), Some(("asst_1", "thread_1")));
        let t: ThreadRef = serde_urlencoded::from_str("assistantId=asst_1&threadId=").unwrap();
        assert_eq!(t.ids(), None);
    }
}
