//! OpenAPI documentation for the blog service.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::models::{
    AuthResponse, AuthorInfo, LoginRequest, MessageResponse, PostResponse, RegisterRequest,
    UserResponse, Visibility,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blog Service API",
        version = "1.0.0",
        description = "Blogging backend: account registration and login, public and private posts with image attachments.",
        license(name = "MIT")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::posts::list_posts,
        crate::handlers::posts::list_my_posts,
        crate::handlers::posts::get_post,
        crate::handlers::posts::create_post,
        crate::handlers::posts::update_post,
        crate::handlers::posts::delete_post,
        crate::handlers::health::health_check
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        UserResponse,
        AuthorInfo,
        PostResponse,
        MessageResponse,
        Visibility,
        ErrorResponse
    )),
    tags(
        (name = "Auth", description = "Registration, login, and account lookup"),
        (name = "Posts", description = "Post creation, browsing, and management"),
        (name = "Health", description = "Service health checks")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            )
        }
    }
}
