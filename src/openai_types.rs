use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Default)]
pub struct OpenAIPayload {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIBatchResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenAIBatchChoice>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIBatchChoice {
    pub message: OpenAIBatchMessage,
    pub finish_reason: Option<String>,
    pub index: u32,
}

/// Completion messages may carry a null `content` (e.g. refusals or tool calls).
#[derive(Deserialize, Debug)]
pub struct OpenAIBatchMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TranscriptionResponse {
    pub text: String,
}

mod assistants {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    pub struct CreateMessage<'a> {
        pub role: &'a str,
        pub content: &'a str,
    }

    #[derive(Serialize)]
    pub struct CreateRun<'a> {
        pub assistant_id: &'a str,
    }

    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum RunStatus {
        Queued,
        InProgress,
        RequiresAction,
        Cancelling,
        Cancelled,
        Failed,
        Completed,
        Incomplete,
        Expired,
        #[serde(other)]
        Unknown,
    }

    impl RunStatus {
        /// The run has not reached a resting state yet.
        pub fn is_pending(self) -> bool {
            matches!(
                self,
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
            )
        }
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct Run {
        pub id: String,
        pub status: RunStatus,
    }

    #[derive(Deserialize, Debug)]
    pub struct MessageList {
        pub data: Vec<ThreadMessage>,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct ThreadMessage {
        pub id: String,
        pub role: String,
        #[serde(default)]
        pub content: Vec<MessageContent>,
    }

    impl ThreadMessage {
        /// Text of the first content part, if the assistant answered with text.
        pub fn assistant_text(&self) -> Option<&str> {
            if self.role != "assistant" {
                return None;
            }
            match self.content.first()? {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            }
        }
    }

    #[derive(Deserialize, Debug, Clone)]
    #[serde(rename_all = "snake_case", tag = "type")]
    pub enum MessageContent {
        Text {
            text: TextContent,
        },
        #[serde(other)]
        Other,
    }

    #[derive(Deserialize, Debug, Clone)]
    pub struct TextContent {
        pub value: String,
    }
}
pub use assistants::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parses_unknown_values() {
        let run: Run = serde_json::from_str(r#"{"id":"run_1","status":"in_progress"}"#).unwrap();
        assert!(run.status.is_pending());
        let run: Run = serde_json::from_str(r#"{"id":"run_1","status":"paused"}"#).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert!(!run.status.is_pending());
    }

    #[test]
    fn only_assistant_text_is_spoken() {
        let json = r#"{"data":[{"id":"msg_1","role":"assistant","content":[
            {"type":"image_file","image_file":{"file_id":"file_1"}}]}]}"#;
        let list: MessageList = serde_json::from_str(json).unwrap();
        assert_eq!(list.data[0].assistant_text(), None);

        let json = r#"{"id":"msg_2","role":"assistant","content":[
            {"type":"text","text":{"value":"Your room is booked.","annotations":[]}}]}"#;
        let msg: ThreadMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.assistant_text(), Some("Your room is booked."));

        let json = r#"{"id":"msg_3","role":"user","content":[
            {"type":"text","text":{"value":"hello","annotations":[]}}]}"#;
        let msg: ThreadMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.assistant_text(), None);
    }
}
