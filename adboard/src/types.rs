//! Common type definitions.
//!
//! All user-generated entity IDs are UUIDs wrapped in type aliases for better
//! type safety:
//!
//! - [`UserId`]: User account identifier
//! - [`AdId`]: Ad listing identifier
//! - [`PhotoId`]: Photo attachment identifier
//!
//! Lookup tables (ad types, cities) use plain integer keys since they hold
//! reference data seeded by migrations.

use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type AdId = Uuid;
pub type PhotoId = Uuid;
pub type AdTypeId = i32;
pub type CityId = i32;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
