//! Relays one caller utterance to a hosted assistant thread and returns the
//! assistant's answer.

use crate::error::AppError;
use crate::openai_types::{Run, RunStatus, ThreadMessage};

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const APOLOGY_NON_TEXT: &str =
    "I apologize, but I encountered an error processing the response.";
pub const APOLOGY_ERROR: &str = "I apologize, but I encountered an error. Please try again.";

/// Hosted assistant operations used by the bridge. Threads and assistants
/// are owned by the provider; nothing here creates them.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<(), AppError>;
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AppError>;
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AppError>;
    /// Newest message on the thread, if any.
    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>, AppError>;
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on the whole wait.
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: Duration::from_secs(30),
        }
    }
}

/// Poll a run until it settles, the deadline passes, or `cancel` fires.
pub async fn wait_for_run(
    assistant: &dyn Assistant,
    thread_id: &str,
    run_id: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<RunStatus, AppError> {
    let poll = async {
        let mut attempts = 0u32;
        loop {
            let run = assistant.retrieve_run(thread_id, run_id).await?;
            attempts += 1;
            if !run.status.is_pending() {
                debug!(run_id=%run_id, status=?run.status, attempts, "run settled");
                break Ok::<_, AppError>(run.status);
            }
            sleep(policy.interval).await;
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(run_id=%run_id, "run wait cancelled");
            Err(AppError::Cancelled("assistant run"))
        }
        res = timeout(policy.deadline, poll) => match res {
            Ok(status) => status,
            Err(_) => {
                warn!(run_id=%run_id, deadline=?policy.deadline, "assistant run did not settle in time");
                Err(AppError::TimedOut("assistant run"))
            }
        },
    }
}

/// Append `utterance` to the thread, run the assistant and fetch its reply.
/// `Ok(None)` means the assistant answered with something other than text.
pub async fn run_turn(
    assistant: &dyn Assistant,
    assistant_id: &str,
    thread_id: &str,
    utterance: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<Option<String>, AppError> {
    let utterance = utterance.trim();
    if utterance.is_empty() {
        return Err(AppError::Validation("empty utterance"));
    }

    assistant.add_user_message(thread_id, utterance).await?;
    let run = assistant.create_run(thread_id, assistant_id).await?;
    debug!(thread_id=%thread_id, run_id=%run.id, "started assistant run");

    let status = if run.status.is_pending() {
        wait_for_run(assistant, thread_id, &run.id, policy, cancel).await?
    } else {
        run.status
    };
    if status != RunStatus::Completed {
        error!(thread_id=%thread_id, run_id=%run.id, status=?status, "assistant run did not complete");
        return Err(AppError::Provider {
            provider: "OpenAI",
            code: None,
            status: None,
            message: format!("run ended with status {status:?}"),
        });
    }

    let message = assistant.latest_message(thread_id).await?;
    Ok(message
        .as_ref()
        .and_then(ThreadMessage::assistant_text)
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai_types::{MessageContent, TextContent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedAssistant {
        /// Statuses returned by successive retrieve_run calls; the last one repeats.
        statuses: Vec<RunStatus>,
        polls: AtomicUsize,
        reply: Option<ThreadMessage>,
        added: Mutex<Vec<String>>,
    }

    impl ScriptedAssistant {
        fn new(statuses: Vec<RunStatus>, reply: Option<&str>) -> Self {
            Self {
                statuses,
                polls: AtomicUsize::new(0),
                reply: reply.map(|text| ThreadMessage {
                    id: "msg_1".to_string(),
                    role: "assistant".to_string(),
                    content: vec![MessageContent::Text {
                        text: TextContent {
                            value: text.to_string(),
                        },
                    }],
                }),
                added: Mutex::new(vec![]),
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
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            let status = *self
                .statuses
                .get(n)
                .or(self.statuses.last())
                .unwrap_or(&RunStatus::Completed);
            Ok(Run {
                id: run_id.to_string(),
                status,
            })
        }

        async fn latest_message(&self, _thread_id: &str) -> Result<Option<ThreadMessage>, AppError> {
            Ok(self.reply.clone())
        }

        async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, AppError> {
            Ok(String::new())
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(5),
            deadline: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn polls_until_completed() {
        let assistant = ScriptedAssistant::new(
            vec![RunStatus::InProgress, RunStatus::InProgress, RunStatus::Completed],
            Some("We have a room for tonight."),
        );
        let cancel = CancellationToken::new();
        let reply = run_turn(&assistant, "asst_1", "thread_1", " Any rooms? ", fast(), &cancel)
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("We have a room for tonight."));
        assert_eq!(assistant.polls.load(Ordering::SeqCst), 3);
        assert_eq!(*assistant.added.lock().unwrap(), ["Any rooms?"]);
    }

    #[tokio::test]
    async fn stuck_run_times_out() {
        let assistant = ScriptedAssistant::new(vec![RunStatus::InProgress], Some("never"));
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();
        let err = run_turn(&assistant, "asst_1", "thread_1", "hello", fast(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_stops_the_wait() {
        let assistant = ScriptedAssistant::new(vec![RunStatus::InProgress], None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            deadline: Duration::from_secs(60),
        };
        let err = run_turn(&assistant, "asst_1", "thread_1", "hello", policy, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
    }

    #[tokio::test]
    async fn failed_run_is_an_error() {
        let assistant = ScriptedAssistant::new(vec![RunStatus::Failed], Some("stale"));
        let cancel = CancellationToken::new();
        let err = run_turn(&assistant, "asst_1", "thread_1", "hello", fast(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider { .. }));
    }

    #[tokio::test]
    async fn non_text_reply_is_none() {
        let assistant = ScriptedAssistant::new(vec![RunStatus::Completed], None);
        let cancel = CancellationToken::new();
        let reply = run_turn(&assistant, "asst_1", "thread_1", "hello", fast(), &cancel)
            .await
            .unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn empty_utterance_is_rejected() {
        let assistant = ScriptedAssistant::new(vec![RunStatus::Completed], Some("hi"));
        let cancel = CancellationToken::new();
        let err = run_turn(&assistant, "asst_1", "thread_1", "  ", fast(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(assistant.added.lock().unwrap().is_empty());
    }
}
