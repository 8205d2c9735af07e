//! 请求 ID
//!
//! 客户端传入合法的 `X-Request-ID` 时沿用，否则生成 UUID。
//! 整个请求在 `request` span 中处理，响应回写同一个 ID。

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{Error, HttpMessage};
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_INBOUND_ID_LENGTH: usize = 64;

/// 存放在 request extensions 中
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// 只接受字母、数字、`-`、`_`，避免把任意内容写进日志和响应头
fn accept_inbound(value: &str) -> bool {
    (1..=MAX_INBOUND_ID_LENGTH).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn request_id_for(req: &ServiceRequest) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| accept_inbound(v))
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 配合 `actix_web::middleware::from_fn` 使用
pub async fn assign_request_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let request_id = request_id_for(&req);
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.path(),
    );

    let mut response = next.call(req).instrument(span).await?;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Ok(response)
}
