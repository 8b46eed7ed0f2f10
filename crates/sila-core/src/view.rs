//! Presentation state derived from the input-focus ("keyboard visible")
//! signal.
//!
//! Nothing here touches the transcript or narration. Values are sampled at
//! caller-supplied instants so the transitions stay pure and testable.

use std::time::{Duration, Instant};

pub const KEYBOARD_SHOW_DURATION: Duration = Duration::from_millis(200);
pub const KEYBOARD_HIDE_DURATION: Duration = Duration::from_millis(200);
pub const INTRO_DURATION: Duration = Duration::from_millis(1000);

/// Vertical travel of the expanded header while it slides out.
pub const EXPANDED_HEADER_TRAVEL: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Full header; input not focused.
    Expanded,
    /// One-line header; input focused.
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tween {
    from: f32,
    to: f32,
    started: Instant,
    duration: Duration,
}

impl Tween {
    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn value_at(&self, now: Instant) -> f32 {
        let t = ease_in_out(self.progress(now));
        self.from + (self.to - self.from) * t
    }
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// A value in [0, 1] that can glide toward a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedValue {
    resting: f32,
    tween: Option<Tween>,
}

impl AnimatedValue {
    pub fn new(value: f32) -> Self {
        Self {
            resting: value.clamp(0.0, 1.0),
            tween: None,
        }
    }

    pub fn value(&self, now: Instant) -> f32 {
        match &self.tween {
            Some(tween) => tween.value_at(now),
            None => self.resting,
        }
    }

    /// Starts a transition from wherever the value currently is, replacing
    /// any transition already running.
    pub fn animate_to(&mut self, target: f32, duration: Duration, now: Instant) {
        let target = target.clamp(0.0, 1.0);
        let from = self.value(now);
        self.resting = target;
        self.tween = Some(Tween {
            from,
            to: target,
            started: now,
            duration,
        });
    }

    /// Freezes the value where it is at `now`.
    pub fn cancel(&mut self, now: Instant) {
        self.resting = self.value(now);
        self.tween = None;
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.tween.is_some_and(|t| t.progress(now) < 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct ViewState {
    keyboard_visible: bool,
    header: AnimatedValue,
    intro: AnimatedValue,
    torn_down: bool,
}

impl ViewState {
    /// Starts with the keyboard hidden and the intro fade-in running.
    pub fn new(now: Instant) -> Self {
        let mut intro = AnimatedValue::new(0.0);
        intro.animate_to(1.0, INTRO_DURATION, now);
        Self {
            keyboard_visible: false,
            header: AnimatedValue::new(1.0),
            intro,
            torn_down: false,
        }
    }

    pub fn keyboard_visible(&self) -> bool {
        self.keyboard_visible
    }

    pub fn mode(&self) -> ViewMode {
        if self.keyboard_visible {
            ViewMode::Compact
        } else {
            ViewMode::Expanded
        }
    }

    /// Applies the external visibility signal. Repeated equal signals and
    /// signals after teardown are ignored. Returns whether anything changed.
    pub fn set_keyboard_visible(&mut self, visible: bool, now: Instant) -> bool {
        if self.torn_down || visible == self.keyboard_visible {
            return false;
        }
        self.keyboard_visible = visible;
        if visible {
            self.header.animate_to(0.0, KEYBOARD_SHOW_DURATION, now);
        } else {
            self.header.animate_to(1.0, KEYBOARD_HIDE_DURATION, now);
        }
        true
    }

    /// 1.0 = expanded header fully shown, 0.0 = compact header fully shown.
    pub fn header_progress(&self, now: Instant) -> f32 {
        self.header.value(now)
    }

    /// Expanded header slide offset, from -travel (hidden) to 0 (in place).
    pub fn expanded_header_offset(&self, now: Instant) -> f32 {
        -EXPANDED_HEADER_TRAVEL * (1.0 - self.header_progress(now))
    }

    pub fn compact_header_opacity(&self, now: Instant) -> f32 {
        1.0 - self.header_progress(now)
    }

    pub fn intro_opacity(&self, now: Instant) -> f32 {
        self.intro.value(now)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.header.is_animating(now) || self.intro.is_animating(now)
    }

    /// Cancels running transitions and stops reacting to signals.
    pub fn teardown(&mut self, now: Instant) {
        self.header.cancel(now);
        self.intro.cancel(now);
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_keyboard_show_moves_header_toward_zero() {
        let start = Instant::now();
        let mut view = ViewState::new(start);
        assert_eq!(view.mode(), ViewMode::Expanded);
        assert!((view.header_progress(start) - 1.0).abs() < EPS);

        assert!(view.set_keyboard_visible(true, start));
        assert_eq!(view.mode(), ViewMode::Compact);

        let mid = view.header_progress(start + KEYBOARD_SHOW_DURATION / 2);
        assert!(mid > 0.0 && mid < 1.0);

        let end = start + KEYBOARD_SHOW_DURATION;
        assert!(view.header_progress(end).abs() < EPS);
        assert!((view.compact_header_opacity(end) - 1.0).abs() < EPS);
        assert!((view.expanded_header_offset(end) + EXPANDED_HEADER_TRAVEL).abs() < EPS);
    }

    #[test]
    fn test_hide_reverses_from_current_value() {
        let start = Instant::now();
        let mut view = ViewState::new(start);
        view.set_keyboard_visible(true, start);

        let halfway = start + KEYBOARD_SHOW_DURATION / 2;
        let at_switch = view.header_progress(halfway);
        view.set_keyboard_visible(false, halfway);
        assert!((view.header_progress(halfway) - at_switch).abs() < EPS);

        let done = halfway + KEYBOARD_HIDE_DURATION;
        assert!((view.header_progress(done) - 1.0).abs() < EPS);
        assert!(view.expanded_header_offset(done).abs() < EPS);
    }

    #[test]
    fn test_repeated_signal_is_ignored() {
        let start = Instant::now();
        let mut view = ViewState::new(start);
        assert!(!view.set_keyboard_visible(false, start));
        assert!(view.set_keyboard_visible(true, start));
        assert!(!view.set_keyboard_visible(true, start + Duration::from_millis(50)));
    }

    #[test]
    fn test_teardown_freezes_and_ignores_signals() {
        let start = Instant::now();
        let mut view = ViewState::new(start);
        view.set_keyboard_visible(true, start);

        let cut = start + KEYBOARD_SHOW_DURATION / 4;
        let frozen = view.header_progress(cut);
        view.teardown(cut);

        let later = cut + Duration::from_secs(5);
        assert!((view.header_progress(later) - frozen).abs() < EPS);
        assert!(!view.is_animating(later));
        assert!(!view.set_keyboard_visible(false, later));
        assert!(view.keyboard_visible());
    }

    #[test]
    fn test_intro_fades_in() {
        let start = Instant::now();
        let view = ViewState::new(start);
        assert!(view.intro_opacity(start).abs() < EPS);
        assert!(view.is_animating(start));
        assert!((view.intro_opacity(start + INTRO_DURATION) - 1.0).abs() < EPS);
        assert!(!view.is_animating(start + INTRO_DURATION));
    }

    #[test]
    fn test_easing_stays_in_unit_interval() {
        for step in 0..=20 {
            let t = step as f32 / 20.0;
            let v = ease_in_out(t);
            assert!((0.0..=1.0).contains(&v), "t={t} v={v}");
        }
        assert!(ease_in_out(0.0).abs() < EPS);
        assert!((ease_in_out(1.0) - 1.0).abs() < EPS);
    }
}
