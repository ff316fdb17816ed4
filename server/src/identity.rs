//! Identifiers for events and tickets.

use uuid::Uuid;

/// Generates a random RFC 4122 version 4 identifier, lowercase and hyphenated.
///
/// No uniqueness check is made here; the store's primary key rejects the
/// (negligible) collision and the insert failure reaches the caller.
pub fn generate() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Whether `value` is a well-formed hyphenated identifier.
pub fn is_well_formed(value: &str) -> bool {
    value.len() == 36 && Uuid::try_parse(value).is_ok()
}
