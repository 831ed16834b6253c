//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations, plus the
//!   photo file storage backend
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories borrow a `PgConnection` and open their own transaction where
//! an operation touches more than one table (ad + photos insert, photos +
//! ad delete). Handlers that need several repository calls to be atomic pass
//! in a transaction instead:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = Users::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```
//!
//! Dropping an uncommitted transaction (for example when the client
//! disconnects and the request future is dropped) rolls it back, so a
//! mid-sequence failure never leaves partial state behind.
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory. The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! adboard::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
