//! Best-effort phone discovery for hotels whose OSM record has no phone tag.
//!
//! Neither source is verified. Whatever they return must still go through
//! `phone::normalize` and `phone::validate` before a call is placed.

use crate::consts::BROWSER_USER_AGENT;
use crate::error::AppError;
use crate::openai::OpenAIClient;
use crate::openai_types::{OpenAIMessage, OpenAIPayload};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error};

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
        .expect("phone pattern compiles")
});

#[async_trait]
pub trait PhoneGuesser: Send + Sync {
    /// `Ok(None)` when the source has no answer.
    async fn guess_phone(&self, hotel: &str, city: &str) -> Result<Option<String>, AppError>;
}

/// First phone-looking substring of `text`.
pub fn find_phone(text: &str) -> Option<&str> {
    PHONE_RE.find(text).map(|m| m.as_str())
}

/// Scrapes a public search engine results page. The page layout and its
/// anti-bot measures are outside our control, so misses are expected.
pub struct SearchPageScraper {
    http_client: reqwest::Client,
    search_url: String,
}

impl SearchPageScraper {
    pub fn new(http_client: reqwest::Client, search_url: &str) -> Self {
        Self {
            http_client,
            search_url: search_url.to_string(),
        }
    }
}

#[async_trait]
impl PhoneGuesser for SearchPageScraper {
    async fn guess_phone(&self, hotel: &str, city: &str) -> Result<Option<String>, AppError> {
        let query = format!("{hotel} {city} phone number");
        let resp = self
            .http_client
            .get(&self.search_url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .query(&[("q", query.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to fetch search results page");
                AppError::Unknown(e.to_string())
            })?;
        let page = resp.text().await.map_err(|e| {
            error!(error=%e, "failed to read search results page");
            AppError::Unknown(e.to_string())
        })?;
        let found = find_phone(&page).map(str::to_string);
        debug!(hotel=%hotel, city=%city, found=?found, "scraped phone");
        Ok(found)
    }
}

/// Asks a chat model for the number. The answer is free text.
pub struct ChatPhoneGuesser {
    client: Arc<OpenAIClient>,
    model: String,
}

impl ChatPhoneGuesser {
    pub fn new(client: Arc<OpenAIClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

pub fn phone_prompt(hotel: &str, city: &str) -> Vec<OpenAIMessage> {
    vec![
        OpenAIMessage {
            role: "system".to_string(),
            content: "You are a helpful assistant that finds hotel contact information."
                .to_string(),
        },
        OpenAIMessage {
            role: "user".to_string(),
            content: format!(
                "Find the phone number for {hotel} in {city}. Return only the phone number in international format."
            ),
        },
    ]
}

#[async_trait]
impl PhoneGuesser for ChatPhoneGuesser {
    async fn guess_phone(&self, hotel: &str, city: &str) -> Result<Option<String>, AppError> {
        let payload = OpenAIPayload {
            model: self.model.clone(),
            messages: phone_prompt(hotel, city),
            ..Default::default()
        };
        let answer = self.client.chat(&payload).await?;
        Ok(answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()))
    }
}
