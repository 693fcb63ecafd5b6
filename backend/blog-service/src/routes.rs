//! Route configuration.
//!
//! Centralized route setup; each domain configures its own scope.

use actix_web::web;

use crate::handlers;
use crate::middleware::JwtAuthMiddleware;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth::configure).configure(posts::configure);
}

mod auth {
    use super::*;

    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope("/auth")
                .route("/register", web::post().to(handlers::auth::register))
                .route("/login", web::post().to(handlers::auth::login))
                .service(
                    web::scope("")
                        .wrap(JwtAuthMiddleware)
                        .route("/me", web::get().to(handlers::auth::me)),
                ),
        );
    }
}

mod posts {
    use super::*;

    /// `/my` is registered before `/{id}` so it is never captured as an
    /// id. The read routes stay outside the auth middleware; `get_post`
    /// resolves the optional identity itself.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope("/posts")
                .route("", web::get().to(handlers::posts::list_posts))
                .service(
                    web::scope("/my")
                        .wrap(JwtAuthMiddleware)
                        .route("", web::get().to(handlers::posts::list_my_posts)),
                )
                .route("/{id}", web::get().to(handlers::posts::get_post))
                .service(
                    web::scope("")
                        .wrap(JwtAuthMiddleware)
                        .route("", web::post().to(handlers::posts::create_post))
                        .route("/{id}", web::put().to(handlers::posts::update_post))
                        .route("/{id}", web::delete().to(handlers::posts::delete_post)),
                ),
        );
    }
}
