//! API request and response data models.
//!
//! These models define the public API contract. They are distinct from the
//! database models so the wire and storage representations can evolve
//! independently, and all of them carry `utoipa` annotations for the
//! generated API documentation.

pub mod ads;
pub mod auth;
pub mod pagination;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic success envelope for operations that do not return a resource.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
