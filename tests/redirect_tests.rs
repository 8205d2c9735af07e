//! Redirect endpoint tests
//!
//! `GET /r/{link_id}`：302 跳转、访问策略与点击记录

mod common;

use std::net::SocketAddr;

use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::test::{self, TestRequest};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};

use linktracker::api::build_app;
use linktracker::services::SecurityLogService;
use linktracker::storage::{LinkStore, LinkUpdate, NewTrackedLink, UtmParams};
use linktracker::utils::password::hash_password;

use common::{CHROME_UA, OWNER, TestDb, app_data, temp_storage};

fn link(id: &str) -> NewTrackedLink {
    NewTrackedLink {
        id: id.to_string(),
        original_url: "https://example.com/landing?utm_source=test".to_string(),
        owner_id: OWNER.to_string(),
        expires_at: None,
        max_clicks: None,
        password_hash: None,
        utm: UtmParams {
            utm_source: Some("test".to_string()),
            ..Default::default()
        },
        campaign_name: None,
    }
}

async fn seed(db: &TestDb, link: NewTrackedLink) {
    db.storage.insert_link(link).await.unwrap();
}

fn visit(path: &str) -> TestRequest {
    let peer: SocketAddr = "203.0.113.5:40000".parse().unwrap();
    TestRequest::get()
        .uri(path)
        .peer_addr(peer)
        .insert_header((header::USER_AGENT, CHROME_UA))
}

fn basic(password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("visitor:{}", password)))
}

async fn body_text(resp: actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_rt::test]
async fn test_redirect_records_click() {
    let db = temp_storage().await;
    seed(&db, link("go1")).await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    let resp = test::call_service(
        &app,
        visit("/r/go1")
            .insert_header((header::REFERER, "https://social.example.net/post"))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://example.com/landing?utm_source=test"
    );

    let stored = db.storage.find_active_link("go1").await.unwrap().unwrap();
    assert_eq!(stored.total_clicks, 1);
    assert_eq!(stored.unique_clicks, 1);
}

#[actix_rt::test]
async fn test_repeat_visitor_is_not_unique() {
    let db = temp_storage().await;
    seed(&db, link("go2")).await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    for _ in 0..3 {
        let resp = test::call_service(&app, visit("/r/go2").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    let stored = db.storage.find_active_link("go2").await.unwrap().unwrap();
    assert_eq!(stored.total_clicks, 3);
    assert_eq!(stored.unique_clicks, 1);
}

#[actix_rt::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let db = temp_storage().await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    let resp = test::call_service(&app, visit("/r/nothing-here").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(resp).await, "Link not found or inactive");

    let resp = test::call_service(&app, visit("/r/bad%20id").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_inactive_link_is_not_found() {
    let db = temp_storage().await;
    seed(&db, link("paused")).await;
    db.storage
        .update_link(
            "paused",
            OWNER,
            LinkUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    let resp = test::call_service(&app, visit("/r/paused").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_expired_link_is_gone() {
    let db = temp_storage().await;
    seed(
        &db,
        NewTrackedLink {
            expires_at: Some(Utc::now() - Duration::minutes(1)),
            ..link("stale")
        },
    )
    .await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    let resp = test::call_service(&app, visit("/r/stale").to_request()).await;
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(body_text(resp).await, "Link has expired");

    let stored = db.storage.find_active_link("stale").await.unwrap().unwrap();
    assert_eq!(stored.total_clicks, 0);
}

#[actix_rt::test]
async fn test_click_cap_allows_exactly_max_clicks() {
    let db = temp_storage().await;
    seed(
        &db,
        NewTrackedLink {
            max_clicks: Some(2),
            ..link("capped")
        },
    )
    .await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    for _ in 0..2 {
        let resp = test::call_service(&app, visit("/r/capped").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    let resp = test::call_service(&app, visit("/r/capped").to_request()).await;
    assert_eq!(resp.status(), StatusCode::GONE);
    assert_eq!(body_text(resp).await, "Link has reached maximum clicks");

    let stored = db.storage.find_active_link("capped").await.unwrap().unwrap();
    assert_eq!(stored.total_clicks, 2);
}

#[actix_rt::test]
async fn test_password_protected_link() {
    let db = temp_storage().await;
    seed(
        &db,
        NewTrackedLink {
            password_hash: Some(hash_password("open-sesame").unwrap()),
            ..link("locked")
        },
    )
    .await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    let resp = test::call_service(&app, visit("/r/locked").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"Link Password\""
    );
    assert_eq!(body_text(resp).await, "Password required");

    let resp = test::call_service(
        &app,
        visit("/r/locked")
            .insert_header((header::AUTHORIZATION, basic("wrong")))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(resp).await, "Invalid password");

    let resp = test::call_service(
        &app,
        visit("/r/locked")
            .insert_header((header::AUTHORIZATION, basic("open-sesame")))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    // 只有成功跳转计数
    let stored = db.storage.find_active_link("locked").await.unwrap().unwrap();
    assert_eq!(stored.total_clicks, 1);

    // 密码错误写入链接所有者的安全日志
    let audit = SecurityLogService::new(db.storage.clone());
    let page = audit
        .page(OWNER, None, None, Some("LINK_PASSWORD_FAILED"))
        .await
        .unwrap();
    assert_eq!(page.logs.len(), 1);
    assert_eq!(page.logs[0].ip_address.as_deref(), Some("203.0.113.5"));
}

#[actix_rt::test]
async fn test_expiry_is_checked_before_password() {
    let db = temp_storage().await;
    seed(
        &db,
        NewTrackedLink {
            password_hash: Some(hash_password("open-sesame").unwrap()),
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..link("oldlock")
        },
    )
    .await;
    let (state, limiters) = app_data(db.storage.clone());
    let app = test::init_service(build_app(state, limiters, Vec::new())).await;

    let resp = test::call_service(&app, visit("/r/oldlock").to_request()).await;
    assert_eq!(resp.status(), StatusCode::GONE);
}
