//! ID generation utilities.

use uuid::Uuid;

/// Generate a new UUID v4.
pub fn uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short random ID (8 characters).
pub fn short_id() -> String {
    let bytes: [u8; 4] = rand::random();
    hex::encode(bytes)
}

/// Generate a random 256-bit signing key, hex encoded.
pub fn secret_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Check whether an item id is safe to use as an object key.
///
/// Allowed: ASCII alphanumeric, underscore, hyphen, dot (but not `.` or `..`).
pub fn is_valid_object_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
