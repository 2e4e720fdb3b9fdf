//! Wake-word detection and command capture
//!
//! The detector classifies each transcript and decides what the session has to
//! do about it. It owns the capture state but never touches timers or
//! callbacks; it returns [`DetectorAction`]s and the session carries them out.
//!
//! ```text
//! AwaitingWakeWord ──wake word──► AwaitingCommand ──final / timeout──► CaptureComplete
//!        ▲                                                                   │
//!        └───────────────────────────────────────────────────────────────────┘
//! ```

use super::state::CaptureState;
use crate::extract::{extract_command, normalize, wake_word_end, CaptureContext};
use std::time::Duration;
use tokio::time::Instant;

/// What the session must do in response to a transcript or timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorAction {
    /// A new capture started
    WakeWordDetected,
    /// (Re)arm the command timeout
    ArmCommandTimeout,
    /// Updated command text while capturing
    Progress(String),
    /// Capture finished with a command; capture timers must be cancelled
    Command(String),
    /// Capture finished without a command; capture timers must be cancelled
    NoCommand(NoCommandReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCommandReason {
    /// Command timeout fired with nothing buffered
    Timeout,
    /// A final result arrived but the text was too short to use
    Unusable,
}

/// Per-session detection state
#[derive(Debug)]
pub struct Detector {
    wake_word: String,
    cooldown: Duration,
    min_command_length: usize,
    capture: CaptureState,
    last_wake_word_at: Option<Instant>,
    /// Command text extracted from transcripts that contained the wake word
    command_buffer: String,
    /// Last text surfaced as progress
    last_progress: String,
    /// Wake word arrived alone; the next final result is the command
    verbatim: bool,
}

impl Detector {
    pub fn new(wake_word: String, cooldown: Duration, min_command_length: usize) -> Self {
        Self {
            wake_word,
            cooldown,
            min_command_length,
            capture: CaptureState::AwaitingWakeWord,
            last_wake_word_at: None,
            command_buffer: String::new(),
            last_progress: String::new(),
            verbatim: false,
        }
    }

    pub fn wake_word(&self) -> &str {
        &self.wake_word
    }

    /// Replace the wake word; any capture in flight is discarded
    pub fn set_wake_word(&mut self, wake_word: String) {
        self.wake_word = wake_word;
        self.reset_capture();
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture
    }

    pub fn is_capturing(&self) -> bool {
        self.capture == CaptureState::AwaitingCommand
    }

    pub fn command_buffer(&self) -> &str {
        &self.command_buffer
    }

    /// Drop capture state without emitting anything
    pub fn reset_capture(&mut self) {
        self.capture = CaptureState::AwaitingWakeWord;
        self.command_buffer.clear();
        self.last_progress.clear();
        self.verbatim = false;
    }

    /// Classify one transcript
    pub fn on_transcript(&mut self, transcript: &str, is_final: bool, now: Instant) -> Vec<DetectorAction> {
        let normalized = normalize(transcript);
        if normalized.is_empty() {
            return Vec::new();
        }

        let mut actions = Vec::new();

        if !self.is_capturing() {
            if wake_word_end(&normalized, &self.wake_word).is_none() {
                return actions;
            }
            if let Some(last) = self.last_wake_word_at {
                if now.duration_since(last) <= self.cooldown {
                    tracing::trace!("Wake word inside cooldown, ignoring");
                    return actions;
                }
            }

            self.reset_capture();
            self.capture = CaptureState::AwaitingCommand;
            self.last_wake_word_at = Some(now);
            actions.push(DetectorAction::WakeWordDetected);
            actions.push(DetectorAction::ArmCommandTimeout);
        }

        self.continue_capture(&normalized, is_final, &mut actions);
        actions
    }

    /// Command timeout expired
    pub fn on_command_timeout(&mut self) -> Vec<DetectorAction> {
        if !self.is_capturing() {
            return Vec::new();
        }

        let best_effort = if !self.command_buffer.is_empty() {
            self.command_buffer.clone()
        } else {
            self.last_progress.clone()
        };

        let action = if self.is_usable(&best_effort) {
            DetectorAction::Command(best_effort)
        } else {
            DetectorAction::NoCommand(NoCommandReason::Timeout)
        };
        self.complete();
        vec![action]
    }

    fn continue_capture(&mut self, normalized: &str, is_final: bool, actions: &mut Vec<DetectorAction>) {
        let anchored = wake_word_end(normalized, &self.wake_word).is_some();

        let context = if self.verbatim {
            CaptureContext::capturing("")
        } else {
            CaptureContext::capturing(&self.command_buffer)
        };
        let command = extract_command(normalized, &self.wake_word, context);

        if anchored {
            self.command_buffer = command.clone();
            self.verbatim = command.is_empty();
        }

        // Wake word with nothing after it: the command comes in a later result
        if anchored && command.is_empty() {
            return;
        }

        if is_final {
            let action = if self.is_usable(&command) {
                DetectorAction::Command(command)
            } else {
                DetectorAction::NoCommand(NoCommandReason::Unusable)
            };
            actions.push(action);
            self.complete();
            return;
        }

        if self.is_usable(&command) && command != self.last_progress {
            self.last_progress = command.clone();
            actions.push(DetectorAction::Progress(command));
            if !actions.contains(&DetectorAction::ArmCommandTimeout) {
                actions.push(DetectorAction::ArmCommandTimeout);
            }
        }
    }

    fn is_usable(&self, command: &str) -> bool {
        !command.is_empty() && command.chars().count() >= self.min_command_length
    }

    fn complete(&mut self) {
        self.capture = CaptureState::CaptureComplete;
        tracing::trace!("Capture complete, awaiting wake word");
        self.reset_capture();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> Detector {
        Detector::new("hey test".to_string(), Duration::from_millis(2000), 1)
    }

    fn commands(actions: &[DetectorAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a {
                DetectorAction::Command(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn wake_word_and_command_in_one_final() {
        let mut d = detector();
        let actions = d.on_transcript("Hey Test turn on the lights", true, Instant::now());

        assert_eq!(actions[0], DetectorAction::WakeWordDetected);
        assert_eq!(commands(&actions), vec!["turn on the lights"]);
        assert_eq!(d.capture_state(), CaptureState::AwaitingWakeWord);
    }

    #[test]
    fn wake_word_only_then_next_final_is_command() {
        let mut d = detector();
        let now = Instant::now();
        let actions = d.on_transcript("hey test", true, now);
        assert_eq!(
            actions,
            vec![DetectorAction::WakeWordDetected, DetectorAction::ArmCommandTimeout]
        );
        assert!(d.is_capturing());

        let actions = d.on_transcript("set a", false, now);
        assert_eq!(
            actions,
            vec![
                DetectorAction::Progress("set a".to_string()),
                DetectorAction::ArmCommandTimeout
            ]
        );

        let actions = d.on_transcript("Set a timer", true, now);
        assert_eq!(commands(&actions), vec!["set a timer"]);
        assert!(!d.is_capturing());
    }

    #[test]
    fn interim_wake_word_then_final_wake_word_keeps_waiting() {
        let mut d = detector();
        let now = Instant::now();
        d.on_transcript("hey test", false, now);
        let actions = d.on_transcript("hey test", true, now);

        assert!(actions.is_empty());
        assert!(d.is_capturing());
    }

    #[test]
    fn no_wake_word_while_idle_does_nothing() {
        let mut d = detector();
        let actions = d.on_transcript("turn on the lights", true, Instant::now());
        assert!(actions.is_empty());
        assert_eq!(d.capture_state(), CaptureState::AwaitingWakeWord);
    }

    #[test]
    fn growing_interims_report_progress_once_per_change() {
        let mut d = detector();
        let now = Instant::now();
        let first = d.on_transcript("hey test turn", false, now);
        assert!(first.contains(&DetectorAction::Progress("turn".to_string())));

        let repeat = d.on_transcript("hey test turn", false, now);
        assert!(repeat.is_empty());

        let grown = d.on_transcript("hey test turn on", false, now);
        assert_eq!(
            grown,
            vec![
                DetectorAction::Progress("turn on".to_string()),
                DetectorAction::ArmCommandTimeout
            ]
        );
        assert_eq!(d.command_buffer(), "turn on");
    }

    #[test]
    fn interim_updates_do_not_retrigger() {
        let mut d = detector();
        let now = Instant::now();
        d.on_transcript("hey test", false, now);
        let actions = d.on_transcript("hey test play", false, now);
        assert!(!actions.contains(&DetectorAction::WakeWordDetected));
    }

    #[test]
    fn cooldown_suppresses_second_trigger() {
        let mut d = detector();
        let start = Instant::now();
        d.on_transcript("hey test lights on", true, start);

        let early = d.on_transcript("hey test lights off", true, start + Duration::from_millis(1500));
        assert!(early.is_empty());

        let late = d.on_transcript("hey test lights off", true, start + Duration::from_millis(2500));
        assert_eq!(late[0], DetectorAction::WakeWordDetected);
        assert_eq!(commands(&late), vec!["lights off"]);
    }

    #[test]
    fn cooldown_must_be_exceeded() {
        let mut d = detector();
        let start = Instant::now();
        d.on_transcript("hey test lights on", true, start);

        let boundary = d.on_transcript("hey test lights off", true, start + Duration::from_millis(2000));
        assert!(boundary.is_empty());

        let after = d.on_transcript("hey test lights off", true, start + Duration::from_millis(2001));
        assert_eq!(commands(&after), vec!["lights off"]);
    }

    #[test]
    fn timeout_uses_buffered_text() {
        let mut d = detector();
        d.on_transcript("hey test open the", false, Instant::now());
        let actions = d.on_command_timeout();
        assert_eq!(actions, vec![DetectorAction::Command("open the".to_string())]);
        assert_eq!(d.capture_state(), CaptureState::AwaitingWakeWord);
        assert_eq!(d.command_buffer(), "");
    }

    #[test]
    fn timeout_without_text_reports_no_command() {
        let mut d = detector();
        d.on_transcript("hey test", true, Instant::now());
        let actions = d.on_command_timeout();
        assert_eq!(actions, vec![DetectorAction::NoCommand(NoCommandReason::Timeout)]);
        assert!(d.on_command_timeout().is_empty());
    }

    #[test]
    fn short_final_is_unusable() {
        let mut d = Detector::new("hey test".to_string(), Duration::from_millis(2000), 3);
        let now = Instant::now();
        d.on_transcript("hey test", true, now);
        let actions = d.on_transcript("ok", true, now);
        assert_eq!(actions, vec![DetectorAction::NoCommand(NoCommandReason::Unusable)]);
        assert!(!d.is_capturing());
    }

    #[test]
    fn dropped_prefix_keeps_partial() {
        let mut d = detector();
        let now = Instant::now();
        d.on_transcript("hey test turn", false, now);
        let actions = d.on_transcript("turn on the lights", true, now);
        assert_eq!(commands(&actions), vec!["turn"]);
    }

    #[test]
    fn set_wake_word_discards_capture() {
        let mut d = detector();
        d.on_transcript("hey test play", false, Instant::now());
        d.set_wake_word("ok house".to_string());
        assert!(!d.is_capturing());
        assert!(d.on_command_timeout().is_empty());
        assert_eq!(d.wake_word(), "ok house");
    }

    #[test]
    fn exactly_one_outcome_per_capture() {
        let mut d = detector();
        let now = Instant::now();
        let mut outcomes = 0;
        for (text, is_final) in [("hey test", false), ("hey test dim", false), ("hey test dim it", true)] {
            outcomes += d
                .on_transcript(text, is_final, now)
                .iter()
                .filter(|a| matches!(a, DetectorAction::Command(_) | DetectorAction::NoCommand(_)))
                .count();
        }
        outcomes += d.on_command_timeout().len();
        assert_eq!(outcomes, 1);
    }
}
