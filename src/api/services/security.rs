//! `/api/security` 审计日志查询

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::api::response::success;
use crate::api::state::AppState;
use crate::errors::Result;
use crate::services::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub action: Option<String>,
}

pub struct SecurityHandlers;

impl SecurityHandlers {
    pub async fn logs(
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        query: web::Query<LogsQuery>,
    ) -> Result<HttpResponse> {
        let page = state
            .security
            .page(&user.id, query.page, query.limit, query.action.as_deref())
            .await?;
        Ok(success(page))
    }

    pub async fn overview(
        user: AuthenticatedUser,
        state: web::Data<AppState>,
    ) -> Result<HttpResponse> {
        Ok(success(state.security.overview(&user.id).await?))
    }
}
