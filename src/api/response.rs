//! 统一 JSON 响应封装 `{success, data?, message?}`

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn success<T: Serialize>(data: T) -> HttpResponse {
    success_with_status(StatusCode::OK, data)
}

pub fn success_with_status<T: Serialize>(status: StatusCode, data: T) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        success: true,
        data: Some(data),
        message: None,
    })
}

pub fn success_message(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> {
        success: true,
        data: None,
        message: Some(message.into()),
    })
}
