//! Text preparation for embedding input.
//!
//! Embedding providers cap their input size, so text is trimmed and cut to
//! `MAX_EMBEDDING_CHARS` characters before it is sent. Post and user inputs are
//! prefixed with identity context to bias retrieval toward the author.

/// Maximum embedding input length (characters, not tokens)
pub const MAX_EMBEDDING_CHARS: usize = 8000;

/// Trim and truncate text for the embedding provider.
///
/// Returns `None` when nothing but whitespace is left.
pub fn prepare_input(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // truncate on char boundaries, never mid UTF-8 sequence
    Some(text.chars().take(MAX_EMBEDDING_CHARS).collect())
}

/// Input used for post embeddings.
pub fn post_input(username: &str, content: &str) -> String {
    format!("Author: {username}\nContent: {content}")
}

/// Input used for user embeddings.
pub fn user_input(username: &str, email: &str) -> String {
    format!("Username: {username}\nEmail: {email}")
}
