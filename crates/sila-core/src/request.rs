//! Outbound request lifecycle.
//!
//! At most one generation request is in flight. The user's message is
//! appended as soon as a send is accepted; the reply (or an explanation of
//! the failure) is appended when the spawned task reports back through the
//! session channel.

use crate::ai::TextGenerator;
use crate::config::Language;
use crate::error::GenerationError;
use crate::session::SessionEvent;
use crate::state::ChatMessage;
use crate::store::MessageStore;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Longest prompt, in characters, that will be sent.
pub const MAX_INPUT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

/// Outcome of one generation request, tagged with the ticket it belongs to.
#[derive(Debug)]
pub struct Completion {
    pub ticket: RequestTicket,
    pub outcome: Result<String, GenerationError>,
}

struct InFlight {
    ticket: RequestTicket,
    task: JoinHandle<()>,
}

pub struct RequestController {
    generator: Arc<dyn TextGenerator>,
    events: UnboundedSender<SessionEvent>,
    language: Language,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    shut_down: bool,
}

impl RequestController {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        events: UnboundedSender<SessionEvent>,
        language: Language,
    ) -> Self {
        Self {
            generator,
            events,
            language,
            in_flight: None,
            next_ticket: 0,
            shut_down: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Accepts `raw` if it has visible content and nothing is pending.
    /// Rejected input is a silent no-op and returns `None`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn send(&mut self, raw: &str, store: &mut MessageStore) -> Option<RequestTicket> {
        let text = raw.trim();
        if text.is_empty() || self.is_pending() || self.shut_down {
            return None;
        }
        let text: String = text.chars().take(MAX_INPUT_CHARS).collect();

        self.next_ticket += 1;
        let ticket = RequestTicket(self.next_ticket);

        store.append(ChatMessage::user(text.clone()));

        let generator = Arc::clone(&self.generator);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(generator.generate(&text))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(GenerationError::Unknown(panic_message(&*panic))));
            // Nobody is listening once the session has been torn down.
            let _ = events.send(SessionEvent::Completion(Completion { ticket, outcome }));
        });

        tracing::info!(ticket = ticket.0, "Generation request dispatched");
        self.in_flight = Some(InFlight { ticket, task });
        Some(ticket)
    }

    /// Applies a completion to the transcript. Completions that don't match
    /// the in-flight ticket, or arrive after shutdown, are dropped.
    pub fn complete(&mut self, completion: Completion, store: &mut MessageStore) -> bool {
        let current = self.in_flight.as_ref().map(|f| f.ticket);
        if self.shut_down || current != Some(completion.ticket) {
            tracing::warn!(ticket = completion.ticket.0, "Ignoring stale completion");
            return false;
        }

        let text = match completion.outcome {
            Ok(reply) => {
                tracing::info!(ticket = completion.ticket.0, "Generation request succeeded");
                reply
            }
            Err(err) => {
                tracing::warn!(
                    ticket = completion.ticket.0,
                    code = err.kind().code(),
                    error = %err,
                    "Generation request failed"
                );
                err.user_message(self.language)
            }
        };
        store.append(ChatMessage::assistant(text));

        self.in_flight = None;
        true
    }

    /// Stops acting on the in-flight request, if any. Its eventual result is
    /// discarded.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!(ticket = in_flight.ticket.0, "Abandoning in-flight request");
            in_flight.task.abort();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> Option<String> {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
}
