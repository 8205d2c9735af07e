//! HTTP surface

pub mod middleware;
pub mod rate_limit;
pub mod response;
pub mod services;
pub mod state;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{Compress, from_fn};
use actix_web::{App, Error, HttpRequest, web};

use crate::errors::LinkTrackerError;
pub use rate_limit::RateLimiters;
pub use state::{AppState, Collaborators};

const JSON_BODY_LIMIT: usize = 64 * 1024;

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> Error {
    LinkTrackerError::invalid_field("body", format!("Invalid JSON body: {}", err)).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> Error {
    LinkTrackerError::invalid_field("query", format!("Invalid query string: {}", err)).into()
}

/// 空列表表示允许任意来源
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .expose_headers(vec!["x-request-id", "www-authenticate"])
        .max_age(3600)
}

/// 组装完整应用（服务器与集成测试共用）
pub fn build_app(
    state: web::Data<AppState>,
    limiters: RateLimiters,
    allowed_origins: Vec<String>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(
            web::JsonConfig::default()
                .limit(JSON_BODY_LIMIT)
                .error_handler(json_error),
        )
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .wrap(from_fn(middleware::assign_request_id))
        .wrap(Compress::default())
        .wrap(build_cors(&allowed_origins))
        .configure(|cfg| services::configure_routes(cfg, &limiters))
}
