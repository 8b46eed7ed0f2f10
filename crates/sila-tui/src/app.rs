use ratatui::layout::Rect;
use sila_core::{ChatMessage, ChatRole, Language, Session, SessionEvent, ViewState};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Ticks per frame of the typing indicator (ticks are 50ms).
const DOTS_TICKS: u8 = 6;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: Session,
    pub view: ViewState,
    pub language: Language,
    pub model: String,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Transcript view
    pub selected: Option<usize>,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
    tick_count: u8,
}

impl App {
    pub fn new(session: Session, language: Language, model: String, now: Instant) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            session,
            view: ViewState::new(now),
            language,
            model,

            input: String::new(),
            cursor: 0,

            selected: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            animation_frame: 0,
            tick_count: 0,
        }
    }

    /// Focusing the input box is this client's "keyboard visible" signal.
    pub fn set_editing(&mut self, editing: bool) {
        self.input_mode = if editing {
            InputMode::Editing
        } else {
            InputMode::Normal
        };
        self.view.set_keyboard_visible(editing, Instant::now());
    }

    pub fn submit(&mut self) {
        if self.session.send(&self.input).is_some() {
            self.input.clear();
            self.cursor = 0;
            self.selected = None;
            self.scroll_to_bottom();
        }
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    pub fn clear_chat(&mut self) {
        if self.session.messages().is_empty() {
            return;
        }
        self.session.clear();
        self.selected = None;
        self.chat_scroll = 0;
    }

    /// Narrates the selected message, or the newest reply if nothing is
    /// selected.
    pub fn toggle_speech(&mut self) {
        let target = self.selected.or_else(|| self.last_assistant_index());
        if let Some(index) = target {
            self.session.toggle_speech(index);
        }
    }

    pub fn on_session_event(&mut self, event: SessionEvent) {
        let before = self.session.messages().len();
        if self.session.handle(event) && self.session.messages().len() > before {
            self.scroll_to_bottom();
        }
    }

    /// Move selection to the next assistant reply.
    pub fn select_next(&mut self) {
        let start = self.selected.map(|i| i + 1).unwrap_or(0);
        let next = self.assistant_indices().find(|&i| i >= start);
        if next.is_some() {
            self.selected = next;
        }
    }

    /// Move selection to the previous assistant reply.
    pub fn select_prev(&mut self) {
        let end = self.selected.unwrap_or(self.session.messages().len());
        let prev = self.assistant_indices().filter(|&i| i < end).last();
        if prev.is_some() {
            self.selected = prev;
        }
    }

    pub fn is_speaking(&self, index: usize) -> bool {
        self.session.active_speech() == Some(index)
    }

    // Chat scrolling
    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = (self.chat_height / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_add(half_page);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = (self.chat_height / 2).max(1);
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        self.tick_count = (self.tick_count + 1) % DOTS_TICKS;
        if self.tick_count == 0 && self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat so the newest message (or the typing indicator) is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        let total = transcript_rows(
            self.session.messages(),
            self.session.is_pending(),
            wrap_width,
        );
        self.chat_scroll = bottom_offset(total, visible_height);
    }

    /// Whether a tick should trigger a redraw.
    pub fn needs_frame(&self, now: Instant) -> bool {
        self.view.is_animating(now) || self.session.is_pending()
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
        self.view.teardown(Instant::now());
    }

    fn assistant_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.session
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_user())
            .map(|(i, _)| i)
    }

    fn last_assistant_index(&self) -> Option<usize> {
        self.assistant_indices().last()
    }
}

/// Rows the chat paragraph needs, estimated the way it wraps.
fn transcript_rows(messages: &[ChatMessage], pending: bool, wrap_width: usize) -> usize {
    let wrap_width = wrap_width.max(1);
    let mut total: usize = 0;

    for msg in messages {
        total = total.saturating_add(1); // Role line
        for line in msg.content.lines() {
            // Use character count, not byte length, for proper UTF-8 handling
            let char_count = line.chars().count();
            total = total.saturating_add(char_count / wrap_width + 1);
        }
        if msg.role == ChatRole::Assistant {
            total = total.saturating_add(1); // Listen/stop label
        }
        total = total.saturating_add(1); // Blank line after message
    }

    if pending {
        total = total.saturating_add(2); // Role line + typing indicator
    }
    total
}

/// Scroll offset that puts the last row at the bottom, clamped to what
/// the paragraph widget can address.
fn bottom_offset(total_rows: usize, visible_height: u16) -> u16 {
    u16::try_from(total_rows.saturating_sub(visible_height as usize)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sila_core::{GeminiClient, SilentSpeechEngine, VoiceSettings};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn app(now: Instant) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(
            Arc::new(GeminiClient::new(None)),
            Box::new(SilentSpeechEngine),
            VoiceSettings::default(),
            Language::English,
            tx,
        );
        App::new(session, Language::English, "gemini-pro".to_string(), now)
    }

    #[test]
    fn test_rows_count_wrapping_and_labels() {
        let messages = vec![
            ChatMessage::user("hello"),
            ChatMessage::assistant("0123456789abc"),
        ];
        // user: role + 1 line + blank; assistant: role + 2 wrapped + label + blank
        assert_eq!(transcript_rows(&messages, false, 10), 3 + 5);
        assert_eq!(transcript_rows(&messages, true, 10), 3 + 5 + 2);
    }

    #[test]
    fn test_huge_transcript_does_not_overflow_scroll() {
        let reply = "x".repeat(60_000);
        let messages = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant(reply.clone()),
            ChatMessage::user("b"),
            ChatMessage::assistant(reply),
        ];
        let total = transcript_rows(&messages, false, 1);
        assert!(total > u16::MAX as usize);
        assert_eq!(bottom_offset(total, 20), u16::MAX);
    }

    #[test]
    fn test_bottom_offset_when_everything_fits() {
        assert_eq!(bottom_offset(5, 20), 0);
        assert_eq!(bottom_offset(25, 20), 5);
    }

    #[test]
    fn test_zero_wrap_width_is_treated_as_one() {
        let messages = vec![ChatMessage::assistant("abc")];
        assert_eq!(transcript_rows(&messages, false, 0), 1 + 4 + 1 + 1);
    }

    #[test]
    fn test_frames_only_needed_while_animating() {
        let start = Instant::now();
        let app = app(start);
        assert!(app.needs_frame(start));
        assert!(!app.needs_frame(start + Duration::from_secs(2)));
    }
}
