//! Display mode state machine for the text-sync and queue views.
//!
//! The UI animates between the two views; this module only decides which
//! state the animation must reflect. A switch requested mid-animation becomes
//! the pending target and is started as soon as the current animation ends.

use serde::{Deserialize, Serialize};
use tracing::debug;

const LOG_TARGET: &str = "lectio::transition";

/// Terminal display modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Text,
    Queue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    #[default]
    TextMode,
    QueueMode,
    TransitioningToText,
    TransitioningToQueue,
}

impl TransitionState {
    /// Mode this state is showing or animating towards
    #[must_use]
    pub const fn heading(self) -> DisplayMode {
        match self {
            Self::TextMode | Self::TransitioningToText => DisplayMode::Text,
            Self::QueueMode | Self::TransitioningToQueue => DisplayMode::Queue,
        }
    }

    #[must_use]
    pub const fn is_transitioning(self) -> bool {
        matches!(self, Self::TransitioningToText | Self::TransitioningToQueue)
    }

    const fn settled(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Text => Self::TextMode,
            DisplayMode::Queue => Self::QueueMode,
        }
    }

    const fn towards(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Text => Self::TransitioningToText,
            DisplayMode::Queue => Self::TransitioningToQueue,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModeTransition {
    state: TransitionState,
    /// Mode requested while an animation was running
    pending: Option<DisplayMode>,
}

impl ModeTransition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> TransitionState {
        self.state
    }

    /// Mode the view will settle in once all requested switches finish
    #[must_use]
    pub fn target(&self) -> DisplayMode {
        self.pending.unwrap_or_else(|| self.state.heading())
    }

    /// Request a switch to `target`.
    ///
    /// Returns `true` if the observable state changed.
    pub fn request_switch(&mut self, target: DisplayMode) -> bool {
        if self.state.is_transitioning() {
            // Only record the eventual target; the running animation is left alone
            self.pending = (target != self.state.heading()).then_some(target);
            debug!(
                target: LOG_TARGET,
                state = ?self.state,
                pending = ?self.pending,
                "Switch queued"
            );
            return false;
        }

        if self.state.heading() == target {
            return false;
        }

        self.state = TransitionState::towards(target);
        debug!(target: LOG_TARGET, state = ?self.state, "Transition started");
        true
    }

    /// Called when the UI finishes animating.
    ///
    /// Settles into the terminal state of the running transition, then starts a
    /// new transition straight away if a different target was requested in the
    /// meantime. Returns `true` if the state changed.
    pub fn complete_transition(&mut self) -> bool {
        if !self.state.is_transitioning() {
            return false;
        }

        let reached = self.state.heading();
        self.state = TransitionState::settled(reached);

        if let Some(pending) = self.pending.take() {
            if pending != reached {
                self.state = TransitionState::towards(pending);
            }
        }

        debug!(target: LOG_TARGET, state = ?self.state, "Transition completed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_text_mode() {
        let transition = ModeTransition::new();
        assert_eq!(transition.state(), TransitionState::TextMode);
        assert_eq!(transition.target(), DisplayMode::Text);
    }

    #[test]
    fn test_request_same_mode_is_noop() {
        let mut transition = ModeTransition::new();
        assert!(!transition.request_switch(DisplayMode::Text));
        assert_eq!(transition.state(), TransitionState::TextMode);
    }

    #[test]
    fn test_switch_and_complete() {
        let mut transition = ModeTransition::new();
        assert!(transition.request_switch(DisplayMode::Queue));
        assert_eq!(transition.state(), TransitionState::TransitioningToQueue);

        assert!(transition.complete_transition());
        assert_eq!(transition.state(), TransitionState::QueueMode);

        assert!(transition.request_switch(DisplayMode::Text));
        assert!(transition.complete_transition());
        assert_eq!(transition.state(), TransitionState::TextMode);
    }

    #[test]
    fn test_repeat_request_while_transitioning_is_noop() {
        let mut transition = ModeTransition::new();
        transition.request_switch(DisplayMode::Queue);
        assert!(!transition.request_switch(DisplayMode::Queue));
        assert_eq!(transition.state(), TransitionState::TransitioningToQueue);

        transition.complete_transition();
        assert_eq!(transition.state(), TransitionState::QueueMode);
    }

    #[test]
    fn test_reversal_mid_animation_reenters_transition() {
        let mut transition = ModeTransition::new();
        transition.request_switch(DisplayMode::Queue);
        transition.request_switch(DisplayMode::Queue);
        transition.request_switch(DisplayMode::Text);

        // The running animation is not disturbed
        assert_eq!(transition.state(), TransitionState::TransitioningToQueue);
        assert_eq!(transition.target(), DisplayMode::Text);

        assert!(transition.complete_transition());
        assert_eq!(transition.state(), TransitionState::TransitioningToText);

        transition.complete_transition();
        assert_eq!(transition.state(), TransitionState::TextMode);
    }

    #[test]
    fn test_last_request_wins() {
        let mut transition = ModeTransition::new();
        transition.request_switch(DisplayMode::Queue);
        transition.request_switch(DisplayMode::Text);
        transition.request_switch(DisplayMode::Queue);

        transition.complete_transition();
        assert_eq!(transition.state(), TransitionState::QueueMode);
    }

    #[test]
    fn test_complete_without_transition_is_noop() {
        let mut transition = ModeTransition::new();
        assert!(!transition.complete_transition());
        assert_eq!(transition.state(), TransitionState::TextMode);
    }
}
