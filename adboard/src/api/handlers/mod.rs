//! HTTP request handlers for all API endpoints.
//!
//! Each handler is responsible for request validation, authentication checks
//! via the [`CurrentUser`](crate::api::models::users::CurrentUser) extractor,
//! business logic execution via the database repositories, and response
//! serialization.
//!
//! # Handler modules
//!
//! - [`auth`]: Registration, login and password reset
//! - [`ads`]: Ad search, multipart creation with photos, and owner-gated
//!   update/delete/mark-sold
//! - [`users`]: The authenticated user's profile
//!
//! # Error handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the JSON error
//! envelope with the appropriate HTTP status code.

pub mod ads;
pub mod auth;
pub mod users;
