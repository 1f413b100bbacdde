// Utility functions shared across the recommendation pipeline

/// Normalize a recommendation title into its deduplication key:
/// lowercase, alphanumerics only. Letters from any script count, so
/// non-English titles keep distinct keys.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Clamp a score to [0, 1], mapping non-finite inputs to the midpoint.
pub fn clamp01(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}
