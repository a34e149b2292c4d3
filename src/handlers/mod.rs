pub mod auth_handlers;
pub mod poll_handlers;

use actix_web::{HttpResponse, web};

use crate::auth::middleware::require_bearer;
use crate::dto::ApiErrorResponse;
use crate::errors::AppError;

/// Configure the `/api` routes. Callers provide `web::Data` for the pool,
/// `TokenKeys` and `RateLimiter`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
    // `/polls/{id}` with a non-numeric id names no poll
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|_err, _req| AppError::NotFound("Poll".to_string()).into()),
    );
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(auth_handlers::login))
                    .route("/signup", web::post().to(auth_handlers::signup)),
            )
            .service(
                web::scope("/polls")
                    .wrap(actix_web::middleware::from_fn(require_bearer))
                    .route("", web::get().to(poll_handlers::list))
                    .route("", web::post().to(poll_handlers::create))
                    .route("/{id}", web::get().to(poll_handlers::read))
                    .route("/{id}", web::put().to(poll_handlers::update))
                    .route("/{id}", web::delete().to(poll_handlers::delete))
                    .route("/{id}/close", web::post().to(poll_handlers::close))
                    .route("/{id}/vote", web::post().to(poll_handlers::vote)),
            ),
    );
}

/// Fallback for unknown routes: JSON 404 like every other error.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiErrorResponse {
        error: "Not found".to_string(),
    })
}
