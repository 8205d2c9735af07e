//! Bearer token 认证中间件
//!
//! 校验通过后把 `AuthenticatedUser` 放入 request extensions，handler 通过提取器获取。

use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::json;
use tracing::{info, trace};

use crate::api::state::AppState;
use crate::errors::LinkTrackerError;
use crate::services::{AuthenticatedUser, SecurityAction};

pub const MISSING_TOKEN_MESSAGE: &str = "Access token required";

#[derive(Clone, Default)]
pub struct BearerAuth;

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: Rc<S>,
}

/// `Authorization: Bearer <token>`，空 token 视为缺失
fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn reject<B>(req: ServiceRequest, error: LinkTrackerError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(error.error_response().map_into_right_body())
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                return Ok(reject(
                    req,
                    LinkTrackerError::identity_provider("Application state not configured"),
                ));
            };

            let Some(token) = extract_bearer_token(&req) else {
                trace!("Request without bearer token: {}", req.path());
                return Ok(reject(
                    req,
                    LinkTrackerError::unauthorized(MISSING_TOKEN_MESSAGE),
                ));
            };

            match state.identity.verify(&token).await {
                Ok(user) => {
                    trace!("Authenticated user {}", user.id);
                    req.extensions_mut().insert(user);
                    let response = srv.call(req).await?.map_into_left_body();
                    Ok(response)
                }
                Err(e) => {
                    info!("Bearer token rejected on {}", req.path());
                    let ctx = state.request_context(req.request());
                    state
                        .security
                        .record(
                            SecurityAction::AuthFailed,
                            None,
                            &ctx,
                            json!({ "path": req.path() }),
                        )
                        .await;
                    Ok(reject(req, e))
                }
            }
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = LinkTrackerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or_else(|| LinkTrackerError::unauthorized(MISSING_TOKEN_MESSAGE)),
        )
    }
}
