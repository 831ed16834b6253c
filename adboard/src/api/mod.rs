//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API structure
//!
//! - **Authentication** (`/auth/*`): registration, login, password reset
//! - **Ads** (`/ads`, `/ads/{id}`): public search plus owner-gated mutation
//! - **Profile** (`/users/profile`): the authenticated user's own account
//! - **Uploads** (`/uploads/*`): static serving of stored photo files
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`; the
//! rendered documentation is served at `/docs`.

pub mod handlers;
pub mod models;
