use crate::bridge::Assistant;
use crate::error::AppError;
use crate::openai_types::{
    CreateMessage, CreateRun, MessageList, OpenAIBatchResponse, OpenAIErrorResponse,
    OpenAIPayload, Run, ThreadMessage, TranscriptionResponse,
};

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

const TRANSCRIPTION_MODEL: &str = "whisper-1";

pub struct OpenAIClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(http_client: reqwest::Client, api_url: &str, api_key: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn authorized(&self, rq: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.as_str();
        rq.header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"))
    }

    fn beta(&self, rq: RequestBuilder) -> RequestBuilder {
        self.authorized(rq).header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(rq: RequestBuilder, what: &str) -> Result<T, AppError> {
        let resp = rq.send().await.map_err(|e| {
            error!(error=%e, what=%what, "failed to send request to OpenAI");
            AppError::Unknown(e.to_string())
        })?;
        let resp = Self::check(resp, what).await?;
        resp.json::<T>().await.map_err(|e| {
            error!(error=%e, what=%what, "failed to deserialize OpenAI response");
            AppError::Unknown(e.to_string())
        })
    }

    async fn check(resp: Response, what: &str) -> Result<Response, AppError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("unexpected response status {status}"));
        error!(status=%status, what=%what, message=%message, "OpenAI request rejected");
        Err(AppError::Provider {
            provider: "OpenAI",
            code: None,
            status: Some(status.as_u16()),
            message,
        })
    }

    /// Single-turn chat completion; returns the first choice's content.
    pub async fn chat(&self, payload: &OpenAIPayload) -> Result<Option<String>, AppError> {
        let url = format!("{}/chat/completions", self.api_url);
        let rq = self.authorized(self.http_client.post(url)).json(payload);
        let resp: OpenAIBatchResponse = Self::send(rq, "chat completion").await?;
        debug!(id=%resp.id, model=%resp.model, "chat completion");
        Ok(resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }
}

#[async_trait]
impl Assistant for OpenAIClient {
    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<(), AppError> {
        let url = format!("{}/threads/{thread_id}/messages", self.api_url);
        let rq = self.beta(self.http_client.post(url)).json(&CreateMessage {
            role: "user",
            content,
        });
        let _: ThreadMessage = Self::send(rq, "create message").await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AppError> {
        let url = format!("{}/threads/{thread_id}/runs", self.api_url);
        let rq = self
            .beta(self.http_client.post(url))
            .json(&CreateRun { assistant_id });
        Self::send(rq, "create run").await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AppError> {
        let url = format!("{}/threads/{thread_id}/runs/{run_id}", self.api_url);
        Self::send(self.beta(self.http_client.get(url)), "retrieve run").await
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>, AppError> {
        let url = format!("{}/threads/{thread_id}/messages", self.api_url);
        let rq = self
            .beta(self.http_client.get(url))
            .query(&[("limit", "1"), ("order", "desc")]);
        let list: MessageList = Self::send(rq, "list messages").await?;
        Ok(list.data.into_iter().next())
    }

    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AppError> {
        let url = format!("{}/audio/transcriptions", self.api_url);
        let file = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| AppError::Unknown(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part("file", file);
        let rq = self.authorized(self.http_client.post(url)).multipart(form);
        let resp: TranscriptionResponse = Self::send(rq, "transcription").await?;
        Ok(resp.text)
    }
}
