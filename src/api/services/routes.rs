//! 路由注册

use actix_web::{HttpRequest, HttpResponse, ResponseError, web};

use super::analytics::AnalyticsHandlers;
use super::health::HealthService;
use super::links::LinkHandlers;
use super::redirect::RedirectService;
use super::security::SecurityHandlers;
use crate::api::middleware::BearerAuth;
use crate::api::rate_limit::RateLimiters;
use crate::errors::LinkTrackerError;

async fn api_not_found(req: HttpRequest) -> HttpResponse {
    LinkTrackerError::not_found(format!("Route not found: {}", req.path())).error_response()
}

/// 需要认证的 `/api` 路由
fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/links")
            .route(web::post().to(LinkHandlers::create))
            .route(web::get().to(LinkHandlers::list)),
    )
    .service(
        web::resource("/links/{link_id}")
            .route(web::get().to(LinkHandlers::get))
            .route(web::put().to(LinkHandlers::update))
            .route(web::delete().to(LinkHandlers::delete)),
    )
    .route(
        "/links/{link_id}/analytics",
        web::get().to(LinkHandlers::analytics),
    )
    .route(
        "/analytics/dashboard",
        web::get().to(AnalyticsHandlers::dashboard),
    )
    .route("/analytics/export", web::get().to(AnalyticsHandlers::export))
    .route("/security/logs", web::get().to(SecurityHandlers::logs))
    .route(
        "/security/overview",
        web::get().to(SecurityHandlers::overview),
    );
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    cfg.route("/health", web::get().to(HealthService::health_check))
        .service(
            web::scope("/r")
                .wrap(limiters.redirect_governor())
                .route("/{link_id}", web::get().to(RedirectService::handle_redirect)),
        )
        .service(
            web::scope("/api")
                .wrap(BearerAuth)
                .wrap(limiters.api_governor())
                .configure(api_routes)
                .default_service(web::to(api_not_found)),
        );
}
