//! Fingerprints of assembled system prompts.

use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for a prompt string.
///
/// Prompts are assembled from database templates at request time, so the
/// fingerprint is what ends up in logs instead of the full text.
pub fn hash_prompt(prompt: &str) -> String {
    Sha256::digest(prompt.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Short form of [`hash_prompt`] for log lines.
pub fn prompt_tag(prompt: &str) -> String {
    hash_prompt(prompt)[..12].to_string()
}
