//! `/api/links` 链接管理与单链接分析

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::api::response::{success, success_message};
use crate::api::state::AppState;
use crate::errors::Result;
use crate::services::link_service::{
    CreateLinkRequest, LinkView, UpdateLinkRequest, validate_link_id,
};
use crate::services::{AuthenticatedUser, Period};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

pub struct LinkHandlers;

impl LinkHandlers {
    pub async fn create(
        req: HttpRequest,
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        body: web::Json<CreateLinkRequest>,
    ) -> Result<HttpResponse> {
        let ctx = state.request_context(&req);
        let link = state
            .link_service
            .create(&user.id, body.into_inner(), &ctx)
            .await?;
        Ok(success(LinkView::new(link, &state.base_url(&req))))
    }

    pub async fn list(
        req: HttpRequest,
        user: AuthenticatedUser,
        state: web::Data<AppState>,
    ) -> Result<HttpResponse> {
        let base_url = state.base_url(&req);
        let links: Vec<LinkView> = state
            .link_service
            .list(&user.id)
            .await?
            .into_iter()
            .map(|link| LinkView::new(link, &base_url))
            .collect();
        Ok(success(links))
    }

    pub async fn get(
        req: HttpRequest,
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        path: web::Path<String>,
    ) -> Result<HttpResponse> {
        let link = state.link_service.get(&user.id, &path).await?;
        Ok(success(LinkView::new(link, &state.base_url(&req))))
    }

    pub async fn update(
        req: HttpRequest,
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        path: web::Path<String>,
        body: web::Json<UpdateLinkRequest>,
    ) -> Result<HttpResponse> {
        let ctx = state.request_context(&req);
        let link = state
            .link_service
            .update(&user.id, &path, body.into_inner(), &ctx)
            .await?;
        Ok(success(LinkView::new(link, &state.base_url(&req))))
    }

    pub async fn delete(
        req: HttpRequest,
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        path: web::Path<String>,
    ) -> Result<HttpResponse> {
        let ctx = state.request_context(&req);
        state.link_service.delete(&user.id, &path, &ctx).await?;
        Ok(success_message("Link deleted successfully"))
    }

    pub async fn analytics(
        user: AuthenticatedUser,
        state: web::Data<AppState>,
        path: web::Path<String>,
        query: web::Query<PeriodQuery>,
    ) -> Result<HttpResponse> {
        validate_link_id(&path)?;
        let period = Period::from_token(query.period.as_deref());
        let snapshot = state
            .analytics
            .link_analytics(&user.id, &path, period)
            .await?;
        Ok(success(snapshot))
    }
}
