pub mod ai;
pub mod config;
pub mod error;
pub mod request;
pub mod session;
pub mod speech;
pub mod state;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use ai::{GeminiClient, TextGenerator};
pub use config::{Config, ConfigError, Language, SpeechConfig};
pub use error::{ErrorKind, GenerationError};
pub use request::{Completion, RequestController, RequestTicket, MAX_INPUT_CHARS};
pub use session::{Session, SessionEvent};
pub use speech::{
    CommandSpeechEngine, SilentSpeechEngine, SpeechController, SpeechEnd, SpeechEngine,
    SpeechSignal, Utterance, UtteranceId, VoiceSettings,
};
pub use state::{ChatMessage, ChatRole};
pub use store::MessageStore;
pub use view::{ViewMode, ViewState};
