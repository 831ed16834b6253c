//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection (or transaction), provides
//! strongly-typed operations, handles query construction and parameter
//! binding, and returns the row models from [`crate::db::models`].
//!
//! # Available repositories
//!
//! - [`Users`]: User account management and authentication lookups
//! - [`Ads`]: Ad listings - transactional create-with-photos, dynamic
//!   filtered search, ownership-gated mutation
//! - [`AdTypes`]: Read-only lookup of ad type names
//! - [`photo_storage`]: The photo file storage backend behind the
//!   [`PhotoStorage`](photo_storage::PhotoStorage) trait
//!
//! The [`Repository`] trait captures the shared create/read surface;
//! operations that only make sense for one entity (ownership-gated mutation,
//! login lookup) are inherent methods on the concrete repository.

pub mod ad_types;
pub mod ads;
pub mod photo_storage;
pub mod repository;
pub mod users;

pub use ad_types::AdTypes;
pub use ads::Ads;
pub use repository::Repository;
pub use users::Users;
