use std::sync::Arc;
use std::time::Duration;

use conduit_persist::MessagePersistence;
use conduit_transcript::{Step, TranscriptAssembler};
use conduit_types::{ConduitError, ConversationThread, Message, Result};
use futures::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::source::{EventSource, StreamRequest};

/// A user message to send to an agent
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub agent_id: String,
    pub text: String,
    /// Existing conversation to continue; `None` starts a new one
    pub thread_id: Option<String>,
}

impl TurnRequest {
    pub fn new(agent_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            text: text.into(),
            thread_id: None,
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// A turn that reached `end`, `[DONE]` or a clean end of stream
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Thread to continue with; server-assigned when the stream announced one
    pub thread: ConversationThread,
    pub user_message: Message,
    pub message: Message,
    pub structured_response: Option<Value>,
}

/// A turn that ended in an error. `message` holds whatever was assembled
/// before the fault, already finalized; it is `None` when the turn was
/// rejected before streaming.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct TurnFailure {
    pub error: ConduitError,
    pub thread: ConversationThread,
    pub message: Option<Message>,
}

/// Handle to a turn running in a background task
pub struct SessionHandle {
    /// Snapshot of the assistant message after every applied event
    pub updates: watch::Receiver<Message>,
    /// Cancelling aborts the stream; the turn then fails with `Cancelled`
    pub cancel: CancellationToken,
    pub join: JoinHandle<std::result::Result<TurnOutcome, TurnFailure>>,
}

/// Reject empty or oversized user input before any network activity
pub fn validate_input(text: &str, max_len: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ConduitError::InvalidInput("message is empty".to_string()));
    }
    let len = text.chars().count();
    if len > max_len {
        return Err(ConduitError::InvalidInput(format!(
            "message is {} characters, the limit is {}",
            len, max_len
        )));
    }
    Ok(())
}

/// Runs one chat turn end to end: validation, streaming, transcript
/// assembly and the hand-off to persistence.
#[derive(Clone)]
pub struct SessionController {
    source: Arc<dyn EventSource>,
    config: SessionConfig,
    persistence: Option<Arc<MessagePersistence>>,
    /// Pending saves, shared by every clone of the controller
    saves: Arc<Mutex<JoinSet<()>>>,
}

impl SessionController {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            config: SessionConfig::default(),
            persistence: None,
            saves: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Save user and assistant messages after each turn
    pub fn with_persistence(mut self, persistence: Arc<MessagePersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn run(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<TurnOutcome, TurnFailure> {
        self.drive(request, cancel, None).await
    }

    /// Like [`run`](Self::run), publishing the assistant message after every event
    pub async fn run_with_updates(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
        updates: &watch::Sender<Message>,
    ) -> std::result::Result<TurnOutcome, TurnFailure> {
        self.drive(request, cancel, Some(updates)).await
    }

    /// Spawn the turn in the background, return a handle to follow or cancel it
    pub fn spawn(&self, request: TurnRequest) -> SessionHandle {
        let (tx, rx) = watch::channel(Message::assistant_placeholder());
        let cancel = CancellationToken::new();

        let controller = self.clone();
        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move { controller.run_with_updates(request, task_cancel, &tx).await });

        SessionHandle {
            updates: rx,
            cancel,
            join,
        }
    }

    async fn drive(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
        updates: Option<&watch::Sender<Message>>,
    ) -> std::result::Result<TurnOutcome, TurnFailure> {
        let mut thread = ConversationThread::resolve(request.thread_id, request.agent_id);

        if let Err(error) = validate_input(&request.text, self.config.max_message_len) {
            tracing::debug!(%error, "turn rejected");
            return Err(TurnFailure {
                error,
                thread,
                message: None,
            });
        }

        let user_message = Message::user(request.text.clone());
        let stream_request = StreamRequest::new(&thread.agent_id, &thread.thread_id, request.text);
        let mut assembler = TranscriptAssembler::with_orchestrator(
            Message::assistant_placeholder(),
            self.config.orchestrator_id.clone(),
        );
        publish(updates, assembler.message());

        // Caller cancel and deadline share one abort token.
        let abort = cancel.child_token();
        let deadline = spawn_deadline(abort.clone(), self.config.timeout);
        let result = self.pump(&stream_request, &abort, &mut assembler, updates).await;
        deadline.abort();

        let result = result.map_err(|error| match error {
            ConduitError::Cancelled if !cancel.is_cancelled() => ConduitError::Timeout(self.config.timeout),
            other => other,
        });

        match &result {
            Ok(()) => assembler.finish(),
            Err(error) => assembler.fail(error.to_string()),
        }
        publish(updates, assembler.message());

        let parts = assembler.into_parts();
        if let Some(server_thread_id) = parts.server_thread_id {
            if server_thread_id != thread.thread_id {
                tracing::debug!(%server_thread_id, "server assigned thread id");
                thread = ConversationThread::resume(server_thread_id, thread.agent_id);
            }
        }

        self.hand_off(&user_message, &parts.message, &thread).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    thread_id = %thread.thread_id,
                    segments = parts.message.segments.len(),
                    tools = parts.message.tool_invocations.len(),
                    "turn completed"
                );
                Ok(TurnOutcome {
                    thread,
                    user_message,
                    message: parts.message,
                    structured_response: parts.structured_response,
                })
            }
            Err(error) => {
                tracing::warn!(thread_id = %thread.thread_id, %error, "turn failed");
                Err(TurnFailure {
                    error,
                    thread,
                    message: Some(parts.message),
                })
            }
        }
    }

    /// Feed events into the assembler until the stream ends or faults
    async fn pump(
        &self,
        request: &StreamRequest,
        abort: &CancellationToken,
        assembler: &mut TranscriptAssembler,
        updates: Option<&watch::Sender<Message>>,
    ) -> Result<()> {
        let mut events = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(ConduitError::Cancelled),
            opened = self.source.open(request, abort.clone()) => opened?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = abort.cancelled() => return Err(ConduitError::Cancelled),
                next = events.next() => next,
            };
            let Some(item) = next else {
                return Ok(());
            };

            let step = assembler.apply(item?);
            publish(updates, assembler.message());
            match step {
                Step::Ended => return Ok(()),
                Step::Failed(message) => return Err(ConduitError::AgentError(message)),
                Step::Continue | Step::Ignored => {}
            }
        }
    }

    /// Save both sides of the turn in background tasks; their outcome never
    /// reaches the caller. The tasks are tracked so they can be drained
    /// with [`wait_for_persistence`](Self::wait_for_persistence).
    async fn hand_off(&self, user_message: &Message, message: &Message, thread: &ConversationThread) {
        let Some(persistence) = &self.persistence else {
            return;
        };

        let mut saves = self.saves.lock().await;
        // Reap finished saves so the set only holds in-flight work
        while saves.try_join_next().is_some() {}

        for record in [user_message.clone(), message.clone()] {
            let persistence = Arc::clone(persistence);
            let thread = thread.clone();
            saves.spawn(async move {
                persistence.save(&record, &thread).await;
            });
        }
    }

    /// Wait until every save handed off by earlier turns has either reached
    /// the backend or landed in the retry queue. Call before shutdown.
    pub async fn wait_for_persistence(&self) {
        let mut saves = self.saves.lock().await;
        while let Some(joined) = saves.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("message save task failed: {}", e);
            }
        }
    }
}

fn publish(updates: Option<&watch::Sender<Message>>, message: &Message) {
    if let Some(tx) = updates {
        tx.send_replace(message.clone());
    }
}

fn spawn_deadline(abort: CancellationToken, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = abort.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(?timeout, "session deadline reached, aborting stream");
                abort.cancel();
            }
        }
    })
}
