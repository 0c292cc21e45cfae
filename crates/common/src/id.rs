//! ID generation utilities.

use ulid::Ulid;

/// ID generator for rows.
///
/// ULIDs sort by creation time, so ordering by `id` matches insertion order
/// and doubles as a pagination cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generate a new lowercase ULID.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
