//! Detection of spoken session-ending phrases.

const EXIT_KEYWORDS: [&str; 2] = ["exit", "bye"];

/// True when the transcript asks to end the session.
///
/// Case-insensitive substring match, so "Exiting now" and "goodbye" both end
/// the session.
pub fn is_exit_phrase(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EXIT_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
