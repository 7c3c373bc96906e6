//! Case-insensitive record identity.

/// Key used for every id comparison: ASCII case folded.
pub fn fold(id: &str) -> String {
    id.to_ascii_lowercase()
}
