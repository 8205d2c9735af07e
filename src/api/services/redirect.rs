//! `GET /r/{link_id}`：策略判定 → 记录点击 → 302

use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, WWW_AUTHENTICATE};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, trace, warn};

use crate::api::state::AppState;
use crate::services::policy::{self, PASSWORD_REALM, PolicyOutcome};
use crate::services::{RequestContext, SecurityAction};
use crate::storage::TrackedLink;
use crate::utils::is_valid_link_id;

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        state: web::Data<AppState>,
    ) -> HttpResponse {
        let link_id = path.into_inner();

        if !is_valid_link_id(&link_id) {
            trace!("Invalid link id rejected: {}", link_id);
            return Self::text(StatusCode::NOT_FOUND, "Link not found or inactive");
        }

        let link = match state.links.find_active_link(&link_id).await {
            Ok(link) => link,
            Err(e) => {
                error!("Failed to load link {}: {}", link_id, e);
                return Self::error_response();
            }
        };

        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let outcome = match policy::evaluate(link.as_ref(), authorization, Utc::now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Password check failed for {}: {}", link_id, e);
                return Self::error_response();
            }
        };

        match outcome {
            PolicyOutcome::Redirect(target) => {
                let ctx = state.request_context(&req);
                if let Err(e) = state.recorder.record(&link_id, &ctx).await {
                    warn!("Click for {} not recorded: {}", link_id, e);
                }
                debug!("Redirecting {} -> {}", link_id, target);
                HttpResponse::Found()
                    .insert_header((LOCATION, target))
                    .finish()
            }
            PolicyOutcome::NotFound => {
                debug!("Link not found or inactive: {}", link_id);
                Self::text(StatusCode::NOT_FOUND, "Link not found or inactive")
            }
            PolicyOutcome::Expired => {
                debug!("Link expired: {}", link_id);
                Self::text(StatusCode::GONE, "Link has expired")
            }
            PolicyOutcome::ClickCapReached => {
                debug!("Link reached click cap: {}", link_id);
                Self::text(StatusCode::GONE, "Link has reached maximum clicks")
            }
            PolicyOutcome::PasswordRequired => Self::password_challenge("Password required"),
            PolicyOutcome::PasswordInvalid => {
                let ctx = state.request_context(&req);
                Self::audit_password_failure(&state, link.as_ref(), &ctx).await;
                Self::password_challenge("Invalid password")
            }
        }
    }

    async fn audit_password_failure(
        state: &AppState,
        link: Option<&TrackedLink>,
        ctx: &RequestContext,
    ) {
        let Some(link) = link else {
            return;
        };
        info!("Invalid password for link {}", link.id);
        state
            .security
            .record(
                SecurityAction::LinkPasswordFailed,
                Some(&link.owner_id),
                ctx,
                json!({ "linkId": link.id }),
            )
            .await;
    }

    fn text(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
            .body(body)
    }

    fn password_challenge(body: &'static str) -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", PASSWORD_REALM)))
            .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
            .body(body)
    }

    fn error_response() -> HttpResponse {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, "Error processing redirect")
    }
}
