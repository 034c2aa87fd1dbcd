// Primary keys in the platform schema are 32-char lowercase hex strings
// (a UUID without dashes). New ids are UUIDv7 so rows sort by creation time.

use uuid::Uuid;

/// Generate a new 32-char hex identifier (UUIDv7, simple form).
pub fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}
