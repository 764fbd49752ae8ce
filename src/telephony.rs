use crate::config::TelephonyConfig;
use crate::consts::STATUS_CALLBACK_EVENTS;
use crate::error::AppError;
use crate::twilio_types::{CreateCallResponse, TwilioErrorResponse};

use async_trait::async_trait;
use tracing::{debug, error};

/// Provider acknowledgement of a newly created call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCall {
    pub call_id: String,
    pub from_number: String,
}

#[async_trait]
pub trait Telephony: Send + Sync {
    /// Dial `to` and execute `twiml` once the call connects.
    async fn place_call(&self, to: &str, twiml: &str) -> Result<PlacedCall, AppError>;
}

pub struct TwilioClient {
    http_client: reqwest::Client,
    api_url: String,
    config: TelephonyConfig,
}

impl TwilioClient {
    pub fn new(http_client: reqwest::Client, api_url: &str, config: &TelephonyConfig) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        }
    }

    pub fn status_callback_url(&self) -> String {
        format!("{}/call-status", self.config.base_url)
    }
}

#[async_trait]
impl Telephony for TwilioClient {
    async fn place_call(&self, to: &str, twiml: &str) -> Result<PlacedCall, AppError> {
        let account_sid = &self.config.account_sid;
        let url = format!(
            "{}/2010-04-01/Accounts/{account_sid}/Calls.json",
            self.api_url
        );
        let callback = self.status_callback_url();
        let mut form = vec![
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Twiml", twiml),
            ("StatusCallback", callback.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];
        form.extend(STATUS_CALLBACK_EVENTS.iter().map(|e| ("StatusCallbackEvent", *e)));

        let resp = self
            .http_client
            .post(url)
            .basic_auth(account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error=%e, "failed to send call request to twilio");
                AppError::Unknown(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let twilio_error = serde_json::from_str::<TwilioErrorResponse>(&body).map_err(|e| {
                error!(error=%e, status=%status, body=%body, "unrecognised twilio error body");
                AppError::Provider {
                    provider: "Twilio",
                    code: None,
                    status: Some(status.as_u16()),
                    message: format!("unexpected response status {status}"),
                }
            })?;
            error!(code=?twilio_error.code, more_info=?twilio_error.more_info, "twilio rejected call");
            return Err(AppError::Provider {
                provider: "Twilio",
                code: twilio_error.code,
                status: twilio_error.status.or(Some(status.as_u16())),
                message: twilio_error.message,
            });
        }

        let created = resp.json::<CreateCallResponse>().await.map_err(|e| {
            error!(error=%e, "failed to deserialize twilio call response");
            AppError::Unknown(e.to_string())
        })?;
        debug!(call_sid=%created.sid, status=?created.status, "twilio accepted call");
        Ok(PlacedCall {
            call_id: created.sid,
            from_number: created
                .from
                .unwrap_or_else(|| self.config.from_number.clone()),
        })
    }
}
