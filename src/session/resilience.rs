//! Recovery policy for an unreliable recognition engine
//!
//! Decides what an engine error means for the session and how long to wait
//! before each restart. The session applies the decisions.

use super::state::EngineErrorKind;
use std::time::Duration;
use tokio::time::Instant;

/// How the session should react to an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Drop silently
    Ignore,
    /// Report to the caller, no restart
    Report,
    /// Report and restart with backoff
    Recover,
    /// Report and stop the session
    Fatal,
}

/// Exponential restart backoff with an attempt cap
#[derive(Debug, Clone)]
pub struct RestartBackoff {
    base: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl RestartBackoff {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt number `attempt` (1-based): `base * 2^(attempt - 1)`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exponent)
    }

    /// Count another attempt and return its delay, or `None` once the cap is reached
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for_attempt(self.attempts))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Classifies engine errors, rate-limiting the noisy "no speech" condition
#[derive(Debug)]
pub struct ErrorFilter {
    no_speech_cooldown: Duration,
    last_no_speech: Option<Instant>,
}

impl ErrorFilter {
    pub fn new(no_speech_cooldown: Duration) -> Self {
        Self {
            no_speech_cooldown,
            last_no_speech: None,
        }
    }

    pub fn classify(&mut self, kind: &EngineErrorKind, now: Instant) -> ErrorDisposition {
        match kind {
            EngineErrorKind::NoSpeech => {
                let repeated = self
                    .last_no_speech
                    .is_some_and(|last| now.duration_since(last) < self.no_speech_cooldown);
                if repeated {
                    return ErrorDisposition::Ignore;
                }
                self.last_no_speech = Some(now);
                ErrorDisposition::Report
            }
            EngineErrorKind::Aborted => ErrorDisposition::Ignore,
            kind if kind.is_fatal() => ErrorDisposition::Fatal,
            _ => ErrorDisposition::Recover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_cap() {
        let mut backoff = RestartBackoff::new(Duration::from_millis(1000), 5);
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(backoff.attempts(), 5);
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn reset_restores_base_delay() {
        let mut backoff = RestartBackoff::new(Duration::from_millis(250), 3);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn large_attempt_saturates() {
        let backoff = RestartBackoff::new(Duration::from_secs(1), 100);
        assert!(backoff.delay_for_attempt(90) >= Duration::from_secs(1 << 30));
    }

    #[test]
    fn repeated_no_speech_is_dropped() {
        let mut filter = ErrorFilter::new(Duration::from_millis(3000));
        let start = Instant::now();
        assert_eq!(filter.classify(&EngineErrorKind::NoSpeech, start), ErrorDisposition::Report);
        assert_eq!(
            filter.classify(&EngineErrorKind::NoSpeech, start + Duration::from_millis(1000)),
            ErrorDisposition::Ignore
        );
        assert_eq!(
            filter.classify(&EngineErrorKind::NoSpeech, start + Duration::from_millis(3500)),
            ErrorDisposition::Report
        );
    }

    #[test]
    fn classification() {
        let mut filter = ErrorFilter::new(Duration::from_millis(3000));
        let now = Instant::now();
        assert_eq!(filter.classify(&EngineErrorKind::Aborted, now), ErrorDisposition::Ignore);
        assert_eq!(filter.classify(&EngineErrorKind::Network, now), ErrorDisposition::Recover);
        assert_eq!(filter.classify(&EngineErrorKind::AudioCapture, now), ErrorDisposition::Recover);
        assert_eq!(
            filter.classify(&EngineErrorKind::Other("bad-grammar".into()), now),
            ErrorDisposition::Recover
        );
        assert_eq!(filter.classify(&EngineErrorKind::NotAllowed, now), ErrorDisposition::Fatal);
    }
}
