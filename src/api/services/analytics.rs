//! `/api/analytics` 总览与导出

use actix_web::http::header::CONTENT_DISPOSITION;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use super::links::PeriodQuery;
use crate::api::response::success;
use crate::api::state::AppState;
use crate::errors::Result;
use crate::services::analytics::{ExportOutput, ExportQuery};
use crate::services::{AuthenticatedUser, Period};

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub link_id: Option<String>,
    pub period: Option<String>,
}

impl From<ExportParams> for ExportQuery {
    fn from(params: ExportParams) -> Self {
        Self {
            format: params.format,
            start_date: params.start_date,
            end_date: params.end_date,
            link_id: params.link_id,
            period: params.period,
        }
    }
}

pub struct AnalyticsHandlers;

impl AnalyticsHandlers {
    pub async fn dashboard(
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        query: web::Query<PeriodQuery>,
    ) -> Result<HttpResponse> {
        let period = Period::from_token(query.period.as_deref());
        let snapshot = state.analytics.dashboard(&user.id, period).await?;
        Ok(success(snapshot))
    }

    pub async fn export(
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        query: web::Query<ExportParams>,
    ) -> Result<HttpResponse> {
        let query = ExportQuery::from(query.into_inner());

        match state.analytics.export(&user.id, &query).await? {
            ExportOutput::Json(rows) => Ok(success(rows)),
            ExportOutput::Csv(csv) => Ok(HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((CONTENT_DISPOSITION, "attachment; filename=analytics.csv"))
                .body(csv)),
        }
    }
}
