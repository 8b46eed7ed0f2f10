//! Narration of assistant replies.
//!
//! The controller keeps at most one utterance alive and only ever reacts to
//! engine callbacks for the utterance it started most recently.

mod command;

pub use command::{CommandSpeechEngine, SilentSpeechEngine};

use crate::config::SpeechConfig;
use crate::session::SessionEvent;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(u64);

/// Fixed narration parameters applied to every utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub locale: String,
    /// 1.0 is the engine's normal speed.
    pub rate: f32,
    /// 1.0 is neutral.
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            locale: "ar-SA".to_string(),
            rate: 0.85,
            pitch: 1.0,
        }
    }
}

impl From<&SpeechConfig> for VoiceSettings {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEnd {
    /// The engine reached the end of the text.
    Done,
    /// Playback was interrupted.
    Stopped,
}

/// Engine completion notification for one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechSignal {
    pub utterance: UtteranceId,
    pub end: SpeechEnd,
}

/// One narration request handed to a [`SpeechEngine`].
///
/// Exactly one of [`Utterance::done`] or [`Utterance::stopped`] can fire,
/// since both consume the utterance.
#[derive(Debug)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: VoiceSettings,
    events: UnboundedSender<SessionEvent>,
}

impl Utterance {
    pub fn new(
        id: UtteranceId,
        text: impl Into<String>,
        voice: VoiceSettings,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            voice,
            events,
        }
    }

    pub fn done(self) {
        self.finish(SpeechEnd::Done);
    }

    pub fn stopped(self) {
        self.finish(SpeechEnd::Stopped);
    }

    fn finish(self, end: SpeechEnd) {
        let signal = SpeechSignal {
            utterance: self.id,
            end,
        };
        // The session may already be gone during shutdown.
        let _ = self.events.send(SessionEvent::Speech(signal));
    }
}

/// A text-to-speech backend. Both calls return immediately; completion is
/// reported through the utterance callbacks.
pub trait SpeechEngine: Send {
    fn speak(&mut self, utterance: Utterance);
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveUtterance {
    id: UtteranceId,
    index: usize,
}

pub struct SpeechController {
    engine: Box<dyn SpeechEngine>,
    voice: VoiceSettings,
    events: UnboundedSender<SessionEvent>,
    active: Option<ActiveUtterance>,
    next_id: u64,
}

impl SpeechController {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        voice: VoiceSettings,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            engine,
            voice,
            events,
            active: None,
            next_id: 0,
        }
    }

    /// Transcript index of the message being narrated, if any.
    pub fn active_index(&self) -> Option<usize> {
        self.active.map(|a| a.index)
    }

    pub fn is_speaking(&self, index: usize) -> bool {
        self.active_index() == Some(index)
    }

    /// Stops narration when `index` is the one speaking, otherwise replaces
    /// whatever is playing with `text`. Returns the new active index.
    pub fn toggle(&mut self, text: &str, index: usize) -> Option<usize> {
        if self.is_speaking(index) {
            tracing::debug!(index, "Stopping narration");
            self.engine.stop();
            self.active = None;
            return None;
        }

        self.engine.stop();

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        self.active = Some(ActiveUtterance { id, index });

        tracing::debug!(index, utterance = id.0, locale = %self.voice.locale, "Starting narration");
        self.engine.speak(Utterance::new(
            id,
            text,
            self.voice.clone(),
            self.events.clone(),
        ));

        Some(index)
    }

    /// Applies an engine callback. Signals for superseded utterances are
    /// ignored. Returns whether the state changed.
    pub fn on_signal(&mut self, signal: SpeechSignal) -> bool {
        match self.active {
            Some(active) if active.id == signal.utterance => {
                tracing::debug!(index = active.index, end = ?signal.end, "Narration finished");
                self.active = None;
                true
            }
            _ => {
                tracing::trace!(utterance = signal.utterance.0, "Ignoring stale speech signal");
                false
            }
        }
    }

    pub fn stop_all(&mut self) {
        self.engine.stop();
        self.active = None;
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum EngineCall {
        Speak { id: UtteranceId, text: String },
        Stop,
    }

    /// Records calls and keeps utterances so tests can fire callbacks.
    #[derive(Clone, Default)]
    pub struct RecordingEngine {
        pub calls: Arc<Mutex<Vec<EngineCall>>>,
        pub pending: Arc<Mutex<Vec<Utterance>>>,
    }

    impl RecordingEngine {
        pub fn calls(&self) -> Vec<EngineCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn take_utterance(&self, id: UtteranceId) -> Option<Utterance> {
            let mut pending = self.pending.lock().unwrap();
            let pos = pending.iter().position(|u| u.id == id)?;
            Some(pending.remove(pos))
        }
    }

    impl SpeechEngine for RecordingEngine {
        fn speak(&mut self, utterance: Utterance) {
            self.calls.lock().unwrap().push(EngineCall::Speak {
                id: utterance.id,
                text: utterance.text.clone(),
            });
            self.pending.lock().unwrap().push(utterance);
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().push(EngineCall::Stop);
        }
    }
}
