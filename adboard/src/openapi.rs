//! OpenAPI documentation for the HTTP API.
//!
//! Aggregates the `utoipa` annotations on the handlers; the rendered
//! documentation is served at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::reset_password,
        crate::api::handlers::users::get_profile,
        crate::api::handlers::users::update_profile,
        crate::api::handlers::ads::search_ads,
        crate::api::handlers::ads::create_ad,
        crate::api::handlers::ads::update_ad,
        crate::api::handlers::ads::delete_ad,
        crate::api::handlers::ads::mark_ad_sold,
    ),
    components(schemas(
        crate::api::models::MessageResponse,
        crate::api::models::auth::RegisterRequest,
        crate::api::models::auth::LoginRequest,
        crate::api::models::auth::ResetPasswordRequest,
        crate::api::models::auth::TokenResponse,
        crate::api::models::users::ProfileResponse,
        crate::api::models::users::ProfileUpdateRequest,
        crate::api::models::ads::AdResponse,
        crate::api::models::ads::AdUpdateRequest,
        crate::api::models::ads::AdSortField,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and password reset"),
        (name = "ads", description = "Ad listings: search, creation and owner-gated mutation"),
        (name = "users", description = "The authenticated user's profile"),
    ),
    info(
        title = "adboard",
        description = "Classifieds marketplace API: accounts, ad listings, search and photo attachments"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}
