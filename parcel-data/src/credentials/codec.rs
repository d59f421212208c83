//! Reversible `ZRN_<base64>_END` wrapping of stored secrets.
//!
//! This only keeps secrets from being readable at a glance; it is not
//! encryption.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const PREFIX: &str = "ZRN_";
const SUFFIX: &str = "_END";

/// Wrap a secret for storage.
///
/// ```
/// use parcel_data::credentials::{deobfuscate, obfuscate};
///
/// let stored = obfuscate("my-key");
/// assert_eq!(stored, "ZRN_bXkta2V5_END");
/// assert_eq!(deobfuscate(&stored).as_deref(), Some("my-key"));
/// ```
#[must_use]
pub fn obfuscate(secret: &str) -> String {
    format!("{PREFIX}{}{SUFFIX}", STANDARD.encode(secret.as_bytes()))
}

/// Unwrap a stored secret; `None` if it is not in the expected form.
#[must_use]
pub fn deobfuscate(stored: &str) -> Option<String> {
    let encoded = stored.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("0123456789abcdef0123456789abcdef")]
    #[case("ключ ✓")]
    fn survives_storage(#[case] secret: &str) {
        assert_eq!(deobfuscate(&obfuscate(secret)).as_deref(), Some(secret));
    }

    #[rstest]
    #[case("plain-secret")]
    #[case("ZRN_bXkta2V5")]
    #[case("bXkta2V5_END")]
    #[case("ZRN_not base64!_END")]
    #[case("ZRN__EN")]
    #[case("ZRN_/w==_END")]
    fn rejects_foreign_values(#[case] stored: &str) {
        assert_eq!(deobfuscate(stored), None);
    }
}
