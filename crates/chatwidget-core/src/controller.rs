//! Widget controller
//!
//! Accepts the two user commands (`submit`, `toggle_visibility`), keeps the
//! conversation store in step with the completion endpoint, and pushes a
//! [`ViewModel`] to every attached [`ViewSink`] whenever something visible
//! changes.
//!
//! At most one completion request is in flight. While it is, further
//! submissions are ignored. The request runs as a spawned tokio task and its
//! result is applied by whoever owns the controller, either from a UI tick
//! ([`WidgetController::poll_reply`]) or by awaiting it
//! ([`WidgetController::settle`]).
//!
//! `submit` must be called from inside a tokio runtime. Without one the
//! request cannot start and the submission ends in the apology bubble.

use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::ai::{Completer, CompletionClient};
use crate::config::{Appearance, WidgetConfig};
use crate::error::Result;
use crate::state::{ChatTurn, ConversationStore, DisplayMessage};

/// Shown in place of a reply when the request fails for any reason
pub const APOLOGY_TEXT: &str =
    "Sorry, I'm having trouble connecting right now. Please try again later.";

type ReplyTask = JoinHandle<Result<String>>;

/// Everything the presentation layer is allowed to see
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub is_open: bool,
    pub is_awaiting_reply: bool,
    pub display_messages: Vec<DisplayMessage>,
}

/// Receives a fresh [`ViewModel`] after every visible state change
pub trait ViewSink {
    fn render(&mut self, view: &ViewModel);
}

impl ViewSink for mpsc::UnboundedSender<ViewModel> {
    fn render(&mut self, view: &ViewModel) {
        // A closed receiver just means the host stopped listening
        let _ = self.send(view.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The user message was recorded and a reply will follow
    Accepted(u64),
    /// The text was empty or only whitespace
    IgnoredBlank,
    /// A reply is still pending
    IgnoredBusy,
    /// The widget was torn down and takes no more input
    Unmounted,
}

pub struct WidgetController {
    store: ConversationStore,
    completer: Arc<dyn Completer>,
    appearance: Appearance,
    is_open: bool,
    in_flight: Option<ReplyTask>,
    mounted: bool,
    sinks: Vec<Box<dyn ViewSink>>,
}

impl WidgetController {
    /// Mount a widget talking to the configured HTTP endpoint
    pub fn mount(config: &WidgetConfig) -> Result<Self> {
        config.validate()?;
        let client = match config.timeout_secs {
            Some(secs) => CompletionClient::with_timeout(
                &config.api_url,
                &config.api_key,
                std::time::Duration::from_secs(secs),
            )?,
            None => CompletionClient::new(&config.api_url, &config.api_key),
        };
        Self::with_completer(config, Arc::new(client))
    }

    /// Mount a widget on top of any completion backend
    pub fn with_completer(config: &WidgetConfig, completer: Arc<dyn Completer>) -> Result<Self> {
        config.validate()?;
        tracing::info!(endpoint = %config.api_url, "chat widget mounted");
        Ok(Self {
            store: ConversationStore::initialize(&config.system_prompt, &config.welcome_message),
            completer,
            appearance: config.appearance.clone(),
            is_open: false,
            in_flight: None,
            mounted: true,
            sinks: Vec::new(),
        })
    }

    /// Register a sink. It immediately receives the current view.
    pub fn attach(&mut self, sink: impl ViewSink + 'static) {
        let mut sink = Box::new(sink);
        sink.render(&self.view_model());
        self.sinks.push(sink);
    }

    /// Record the user message and start the request for a reply.
    ///
    /// Needs a current tokio runtime to spawn the request. Without one the
    /// message is still recorded and answered with [`APOLOGY_TEXT`].
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if !self.mounted {
            return SubmitOutcome::Unmounted;
        }
        if self.in_flight.is_some() {
            tracing::debug!("submit ignored, reply still pending");
            return SubmitOutcome::IgnoredBusy;
        }
        let message = match self.store.append_user_turn(text) {
            Ok(message) => message,
            Err(_) => return SubmitOutcome::IgnoredBlank,
        };
        tracing::debug!(
            id = message.id,
            turns = self.transcript().len(),
            "user message accepted"
        );

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::warn!(error = %err, "no tokio runtime for the completion request");
                self.store.append_transient_bot_message(APOLOGY_TEXT);
                self.publish();
                return SubmitOutcome::Accepted(message.id);
            }
        };

        // The snapshot is taken after the append so the request includes it
        let transcript = self.store.snapshot_transcript();
        let completer = Arc::clone(&self.completer);
        self.in_flight = Some(runtime.spawn(async move {
            completer.complete(&transcript).await
        }));

        self.publish();
        SubmitOutcome::Accepted(message.id)
    }

    pub fn toggle_visibility(&mut self) {
        if !self.mounted {
            return;
        }
        self.is_open = !self.is_open;
        self.publish();
    }

    /// Apply the pending reply if its task has finished. Never blocks.
    ///
    /// Returns true when a reply (or an apology) was added.
    pub fn poll_reply(&mut self) -> bool {
        let finished = self
            .in_flight
            .as_ref()
            .is_some_and(|task| task.is_finished());
        if !finished {
            return false;
        }

        let Some(mut task) = self.in_flight.take() else {
            return false;
        };
        match (&mut task).now_or_never() {
            Some(outcome) => self.apply(outcome),
            None => {
                self.in_flight = Some(task);
                false
            }
        }
    }

    /// Wait for the pending reply, if any, and apply it.
    ///
    /// Cancel-safe: dropping this future leaves the request in flight.
    pub async fn settle(&mut self) -> bool {
        let Some(task) = self.in_flight.as_mut() else {
            return false;
        };
        let outcome = task.await;
        self.in_flight = None;
        self.apply(outcome)
    }

    /// Tear the widget down. A pending request is aborted and its result,
    /// should it still arrive, is discarded.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.sinks.clear();
        tracing::info!("chat widget unmounted");
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            is_open: self.is_open,
            is_awaiting_reply: self.is_awaiting_reply(),
            display_messages: self.store.snapshot_messages(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        self.store.messages()
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub(crate) fn transcript(&self) -> &[ChatTurn] {
        self.store.transcript()
    }

    fn apply(&mut self, outcome: std::result::Result<Result<String>, JoinError>) -> bool {
        if !self.mounted {
            tracing::debug!("discarding reply for unmounted widget");
            return false;
        }

        match outcome {
            Ok(Ok(reply)) => {
                tracing::debug!(chars = reply.len(), "reply received");
                self.store.append_assistant_turn(&reply);
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "completion request failed");
                self.store.append_transient_bot_message(APOLOGY_TEXT);
            }
            Err(err) => {
                tracing::warn!(error = %err, "completion task did not finish");
                self.store.append_transient_bot_message(APOLOGY_TEXT);
            }
        }

        self.publish();
        true
    }

    fn publish(&mut self) {
        if self.sinks.is_empty() {
            return;
        }
        let view = self.view_model();
        for sink in &mut self.sinks {
            sink.render(&view);
        }
    }
}

impl Drop for WidgetController {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
