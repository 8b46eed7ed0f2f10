//! The session controller: transcript, request lifecycle and narration
//! behind one event-driven facade.
//!
//! All mutation happens through `&mut Session` on the host's event loop.
//! Asynchronous work (generation requests, speech engine callbacks) reports
//! back as [`SessionEvent`]s on the channel handed to [`Session::new`], and
//! the host feeds them into [`Session::handle`] one at a time.

use crate::ai::TextGenerator;
use crate::config::Language;
use crate::request::{Completion, RequestController, RequestTicket};
use crate::speech::{SpeechController, SpeechEngine, SpeechSignal, VoiceSettings};
use crate::state::ChatMessage;
use crate::store::MessageStore;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug)]
pub enum SessionEvent {
    Completion(Completion),
    Speech(SpeechSignal),
}

pub struct Session {
    store: MessageStore,
    requests: RequestController,
    speech: SpeechController,
}

impl Session {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        engine: Box<dyn SpeechEngine>,
        voice: VoiceSettings,
        language: Language,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            store: MessageStore::new(),
            requests: RequestController::new(generator, events.clone(), language),
            speech: SpeechController::new(engine, voice, events),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.all()
    }

    pub fn is_pending(&self) -> bool {
        self.requests.is_pending()
    }

    pub fn active_speech(&self) -> Option<usize> {
        self.speech.active_index()
    }

    pub fn send(&mut self, raw: &str) -> Option<RequestTicket> {
        self.requests.send(raw, &mut self.store)
    }

    /// Toggles narration of the assistant message at `index`. User messages
    /// and out-of-range indices are refused.
    pub fn toggle_speech(&mut self, index: usize) -> bool {
        let Some(message) = self.store.get(index) else {
            return false;
        };
        if message.is_user() {
            return false;
        }
        self.speech.toggle(&message.content, index);
        true
    }

    /// Empties the transcript and silences narration. An in-flight request
    /// stays pending and will still append its reply.
    pub fn clear(&mut self) {
        self.store.clear();
        self.speech.stop_all();
    }

    /// Returns whether the event changed visible state.
    pub fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Completion(completion) => {
                self.requests.complete(completion, &mut self.store)
            }
            SessionEvent::Speech(signal) => self.speech.on_signal(signal),
        }
    }

    /// Teardown: stop narration and disregard any outstanding request.
    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down session");
        self.speech.stop_all();
        self.requests.shutdown();
    }
}
