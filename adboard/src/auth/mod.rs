//! Authentication system.
//!
//! - [`password`]: Password hashing and verification using Argon2
//! - [`session`]: JWT session token creation and verification
//! - [`current_user`]: Extractor for the authenticated user in handlers
//!
//! Clients authenticate with `POST /auth/login` and present the returned
//! token on subsequent requests as `Authorization: Bearer <token>`. Handlers
//! that require authentication take a
//! [`CurrentUser`](crate::api::models::users::CurrentUser) argument; the
//! extractor rejects requests with a missing token (401) or an invalid or
//! expired one (403).

pub mod current_user;
pub mod password;
pub mod session;
