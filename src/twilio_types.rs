pub fn wrap_twiml(twiml: String) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{twiml}")
}

mod twiml {
    use xmlserde_derives::XmlSerialize;

    #[derive(PartialEq, Eq, XmlSerialize)]
    #[xmlserde(root = b"Response")]
    pub struct Response {
        #[xmlserde(ty = "untag")]
        pub actions: Vec<ResponseAction>,
    }

    #[derive(PartialEq, Eq, XmlSerialize)]
    pub enum ResponseAction {
        #[xmlserde(name = b"Say")]
        Say(SayAction),
        #[xmlserde(name = b"Dial")]
        Dial(DialAction),
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct SayAction {
        #[xmlserde(ty = "text")]
        pub text: String,
        #[xmlserde(name = b"voice", ty = "attr")]
        pub voice: Option<String>,
        #[xmlserde(name = b"language", ty = "attr")]
        pub language: Option<String>,
    }

    #[derive(PartialEq, Eq, XmlSerialize, Default)]
    pub struct DialAction {
        #[xmlserde(ty = "text")]
        pub number: String,
        #[xmlserde(name = b"timeout", ty = "attr")]
        pub timeout: Option<u16>,
        #[xmlserde(name = b"callerId", ty = "attr")]
        pub caller_id: Option<String>,
    }
}
pub use twiml::*;

/// Render a complete TwiML document.
pub fn render(actions: Vec<ResponseAction>) -> String {
    wrap_twiml(xmlserde::xml_serialize(Response { actions }))
}

mod rest {
    use crate::calls::CallPhase;
    use serde::{Deserialize, Serialize};
    use std::str::FromStr;

    /// Call status tokens Twilio reports in callbacks and REST responses.
    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "kebab-case")]
    pub enum CallStatus {
        Queued,
        Initiated,
        Ringing,
        InProgress,
        Completed,
        Busy,
        Failed,
        NoAnswer,
        Canceled,
    }

    impl CallStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                CallStatus::Queued => "queued",
                CallStatus::Initiated => "initiated",
                CallStatus::Ringing => "ringing",
                CallStatus::InProgress => "in-progress",
                CallStatus::Completed => "completed",
                CallStatus::Busy => "busy",
                CallStatus::Failed => "failed",
                CallStatus::NoAnswer => "no-answer",
                CallStatus::Canceled => "canceled",
            }
        }

        /// Position in the call lifecycle; callbacks may arrive out of order.
        pub fn rank(self) -> u8 {
            match self {
                CallStatus::Queued | CallStatus::Initiated => 1,
                CallStatus::Ringing => 2,
                CallStatus::InProgress => 3,
                CallStatus::Completed
                | CallStatus::Busy
                | CallStatus::Failed
                | CallStatus::NoAnswer
                | CallStatus::Canceled => 4,
            }
        }

        pub fn phase(self) -> CallPhase {
            match self {
                CallStatus::Completed => CallPhase::Completed,
                CallStatus::Busy
                | CallStatus::Failed
                | CallStatus::NoAnswer
                | CallStatus::Canceled => CallPhase::Failed,
                _ => CallPhase::Connected,
            }
        }
    }

    impl Serialize for CallStatus {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.as_str())
        }
    }

    impl FromStr for CallStatus {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let status = match s.trim() {
                "queued" => CallStatus::Queued,
                "initiated" => CallStatus::Initiated,
                "ringing" => CallStatus::Ringing,
                "in-progress" | "answered" => CallStatus::InProgress,
                "completed" => CallStatus::Completed,
                "busy" => CallStatus::Busy,
                "failed" => CallStatus::Failed,
                "no-answer" => CallStatus::NoAnswer,
                "canceled" => CallStatus::Canceled,
                _ => return Err(()),
            };
            Ok(status)
        }
    }

    /// Form body Twilio posts to the status callback url.
    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "PascalCase")]
    pub struct StatusCallbackPayload {
        pub call_sid: String,
        pub call_status: String,
        #[serde(default)]
        pub account_sid: Option<String>,
        #[serde(default)]
        pub call_duration: Option<String>,
        #[serde(default)]
        pub sequence_number: Option<String>,
    }

    /// Form body Twilio posts to a `<Gather input="speech">` action url.
    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "PascalCase")]
    pub struct SpeechPayload {
        #[serde(default)]
        pub speech_result: Option<String>,
        #[serde(default)]
        pub call_sid: Option<String>,
        #[serde(default)]
        pub confidence: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateCallResponse {
        pub sid: String,
        pub status: Option<CallStatus>,
        pub from: Option<String>,
        pub to: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    pub struct TwilioErrorResponse {
        pub code: Option<i64>,
        pub message: String,
        pub more_info: Option<String>,
        pub status: Option<u16>,
    }
}
pub use rest::*;
