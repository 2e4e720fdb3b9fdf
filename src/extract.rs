//! Command extraction
//!
//! Derives the command text from a raw transcript, the configured wake word,
//! and what the detector knows about the capture in flight. Everything here is
//! a pure function: the detector owns all state.

/// What the detector knows about the current capture
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureContext<'a> {
    /// Whether a wake word has triggered and a command is awaited
    pub capturing: bool,
    /// Command text already extracted from an earlier transcript of this capture
    pub partial: &'a str,
}

impl<'a> CaptureContext<'a> {
    /// Context for a transcript that arrives outside any capture
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn capturing(partial: &'a str) -> Self {
        Self {
            capturing: true,
            partial,
        }
    }
}

/// Trim and lower-case a transcript or wake word
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Byte offset just past the last occurrence of `wake_word` in `normalized`
///
/// Both arguments must already be normalized. Embedded occurrences count,
/// there is no word-boundary check.
pub fn wake_word_end(normalized: &str, wake_word: &str) -> Option<usize> {
    if wake_word.is_empty() {
        return None;
    }
    normalized
        .rfind(wake_word)
        .map(|start| start + wake_word.len())
}

/// Derive the command text from `raw`
///
/// 1. If the wake word occurs, the trimmed text after its last occurrence.
/// 2. Else, mid-capture with a partial command, that partial unchanged.
/// 3. Else, mid-capture, the whole normalized transcript.
/// 4. Else empty.
pub fn extract_command(raw: &str, wake_word: &str, context: CaptureContext<'_>) -> String {
    let transcript = normalize(raw);
    let wake_word = normalize(wake_word);

    if let Some(end) = wake_word_end(&transcript, &wake_word) {
        return transcript[end..].trim().to_string();
    }

    if context.capturing {
        if !context.partial.is_empty() {
            return context.partial.to_string();
        }
        return transcript;
    }

    String::new()
}
