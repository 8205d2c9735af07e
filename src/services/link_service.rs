//! 链接管理服务
//!
//! 校验、ID 分配、URL/UTM 处理、密码哈希以及审计记录。所有读写都限定在 owner 范围内。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::enrichment::RequestContext;
use super::security_log::{SecurityAction, SecurityLogService};
use crate::errors::{FieldError, LinkTrackerError, Result};
use crate::storage::{LinkStore, LinkUpdate, NewTrackedLink, TrackedLink, UtmParams};
use crate::utils::password::{process_new_password, process_update_password};
use crate::utils::url_validator::{merge_utm_params, validation_error_message};
use crate::utils::{MAX_LINK_ID_LENGTH, generate_random_code, is_valid_link_id, parse_iso8601};

const MAX_LABEL_LENGTH: usize = 255;
const MAX_CLICKS_LIMIT: i64 = 1_000_000;
const PASSWORD_LENGTH: std::ops::RangeInclusive<usize> = 3..=100;
/// ID 冲突时的最大重试次数
const ID_ATTEMPTS: usize = 3;

/// 区分“字段缺失”（None）和“显式 null”（Some(None)）
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub original_url: String,
    pub campaign_name: Option<String>,
    pub expires_at: Option<String>,
    pub max_clicks: Option<i64>,
    pub password: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
}

/// 部分更新；`password` 为空字符串时移除密码
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLinkRequest {
    pub original_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub campaign_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_clicks: Option<Option<i64>>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub utm: UtmParams,
}

/// 对外返回的链接视图（不含密码哈希）
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub id: String,
    pub original_url: String,
    pub campaign_name: Option<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i64>,
    #[serde(flatten)]
    pub utm: UtmParams,
    pub total_clicks: i64,
    pub unique_clicks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trackable_url: String,
    pub has_password: bool,
}

impl LinkView {
    pub fn new(link: TrackedLink, base_url: &str) -> Self {
        let has_password = link.has_password();
        Self {
            trackable_url: trackable_url(base_url, &link.id),
            id: link.id,
            original_url: link.original_url,
            campaign_name: link.campaign_name,
            is_active: link.is_active,
            expires_at: link.expires_at,
            max_clicks: link.max_clicks,
            utm: link.utm,
            total_clicks: link.total_clicks,
            unique_clicks: link.unique_clicks,
            created_at: link.created_at,
            updated_at: link.updated_at,
            has_password,
        }
    }
}

pub fn trackable_url(base_url: &str, link_id: &str) -> String {
    format!("{}/r/{}", base_url.trim_end_matches('/'), link_id)
}

/// 路径中的链接 ID 校验
pub fn validate_link_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_LINK_ID_LENGTH {
        return Err(LinkTrackerError::invalid_field(
            "linkId",
            "Link ID must be between 1 and 20 characters",
        ));
    }
    if !is_valid_link_id(id) {
        return Err(LinkTrackerError::invalid_field(
            "linkId",
            "Link ID can only contain letters, numbers, hyphens, and underscores",
        ));
    }
    Ok(())
}

// ============ Field validation ============

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_label(errors: &mut Vec<FieldError>, field: &str, value: Option<&str>, message: &str) {
    if value.is_some_and(|v| v.chars().count() > MAX_LABEL_LENGTH) {
        errors.push(FieldError::new(field, message));
    }
}

fn check_utm(errors: &mut Vec<FieldError>, utm: &UtmParams) {
    for (field, value, label) in [
        ("utm_source", &utm.utm_source, "source"),
        ("utm_medium", &utm.utm_medium, "medium"),
        ("utm_campaign", &utm.utm_campaign, "campaign"),
        ("utm_term", &utm.utm_term, "term"),
        ("utm_content", &utm.utm_content, "content"),
    ] {
        check_label(
            errors,
            field,
            value.as_deref(),
            &format!("UTM {} must be less than 255 characters", label),
        );
    }
}

fn check_expires_at(errors: &mut Vec<FieldError>, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = non_empty(raw)?;
    let parsed = parse_iso8601(raw, false);
    if parsed.is_none() {
        errors.push(FieldError::new(
            "expires_at",
            "Please provide a valid date format (ISO 8601)",
        ));
    }
    parsed
}

fn check_max_clicks(errors: &mut Vec<FieldError>, max_clicks: Option<i64>) {
    if max_clicks.is_some_and(|n| !(1..=MAX_CLICKS_LIMIT).contains(&n)) {
        errors.push(FieldError::new(
            "max_clicks",
            "Max clicks must be a positive integer",
        ));
    }
}

fn check_password(errors: &mut Vec<FieldError>, password: Option<&str>) {
    if let Some(pwd) = password.filter(|p| !p.is_empty())
        && !PASSWORD_LENGTH.contains(&pwd.chars().count())
    {
        errors.push(FieldError::new(
            "password",
            "Password must be between 3 and 100 characters",
        ));
    }
}

fn check_url(errors: &mut Vec<FieldError>, raw: &str, utm: &UtmParams) -> Option<String> {
    match merge_utm_params(raw, utm) {
        Ok(url) => Some(url),
        Err(e) => {
            errors.push(FieldError::new("original_url", validation_error_message(&e)));
            None
        }
    }
}

fn finish(errors: Vec<FieldError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LinkTrackerError::validation(errors))
    }
}

/// 未提供的 UTM 字段沿用已有值
fn overlay_utm(existing: &UtmParams, supplied: &UtmParams) -> UtmParams {
    let pick = |new: &Option<String>, old: &Option<String>| {
        non_empty(new.as_deref())
            .map(String::from)
            .or_else(|| old.clone())
    };
    UtmParams {
        utm_source: pick(&supplied.utm_source, &existing.utm_source),
        utm_medium: pick(&supplied.utm_medium, &existing.utm_medium),
        utm_campaign: pick(&supplied.utm_campaign, &existing.utm_campaign),
        utm_term: pick(&supplied.utm_term, &existing.utm_term),
        utm_content: pick(&supplied.utm_content, &existing.utm_content),
    }
}

fn clean_utm(utm: &UtmParams) -> UtmParams {
    overlay_utm(&UtmParams::default(), utm)
}

// ============ Service ============

#[derive(Clone)]
pub struct LinkService {
    links: Arc<dyn LinkStore>,
    audit: SecurityLogService,
    id_length: usize,
}

impl LinkService {
    pub fn new(links: Arc<dyn LinkStore>, audit: SecurityLogService, id_length: usize) -> Self {
        Self {
            links,
            audit,
            id_length: id_length.clamp(4, MAX_LINK_ID_LENGTH),
        }
    }

    async fn allocate_id(&self) -> Result<String> {
        for _ in 0..ID_ATTEMPTS {
            let id = generate_random_code(self.id_length);
            if !self.links.link_exists(&id).await? {
                return Ok(id);
            }
            warn!("Link id collision on {}, drawing again", id);
        }
        Err(LinkTrackerError::database_operation(
            "Failed to allocate a unique link id",
        ))
    }

    pub async fn create(
        &self,
        owner_id: &str,
        req: CreateLinkRequest,
        ctx: &RequestContext,
    ) -> Result<TrackedLink> {
        let mut errors = Vec::new();
        let utm = clean_utm(&req.utm);
        let campaign_name = non_empty(req.campaign_name.as_deref()).map(String::from);

        let final_url = check_url(&mut errors, &req.original_url, &utm);
        check_label(
            &mut errors,
            "campaign_name",
            campaign_name.as_deref(),
            "Campaign name must be less than 255 characters",
        );
        let expires_at = check_expires_at(&mut errors, req.expires_at.as_deref());
        check_max_clicks(&mut errors, req.max_clicks);
        check_password(&mut errors, req.password.as_deref());
        check_utm(&mut errors, &utm);
        finish(errors)?;

        let password_hash = process_new_password(req.password.as_deref())?;
        let id = self.allocate_id().await?;

        let link = self
            .links
            .insert_link(NewTrackedLink {
                id,
                original_url: final_url.unwrap_or_default(),
                owner_id: owner_id.to_string(),
                expires_at,
                max_clicks: req.max_clicks,
                password_hash,
                utm,
                campaign_name,
            })
            .await?;

        self.audit
            .record(
                SecurityAction::LinkCreated,
                Some(owner_id),
                ctx,
                json!({ "linkId": link.id }),
            )
            .await;
        info!("LinkService: created link '{}' -> '{}'", link.id, link.original_url);

        Ok(link)
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<TrackedLink>> {
        self.links.list_links(owner_id).await
    }

    pub async fn get(&self, owner_id: &str, link_id: &str) -> Result<TrackedLink> {
        validate_link_id(link_id)?;
        self.links
            .find_owned_link(link_id, owner_id)
            .await?
            .ok_or_else(|| LinkTrackerError::not_found("Link not found"))
    }

    pub async fn update(
        &self,
        owner_id: &str,
        link_id: &str,
        req: UpdateLinkRequest,
        ctx: &RequestContext,
    ) -> Result<TrackedLink> {
        let existing = self.get(owner_id, link_id).await?;

        let mut errors = Vec::new();
        let supplied_utm = clean_utm(&req.utm);
        let utm_supplied = !supplied_utm.pairs().is_empty();

        let mut update = LinkUpdate {
            is_active: req.is_active,
            ..Default::default()
        };

        if req.original_url.is_some() || utm_supplied {
            let base = req
                .original_url
                .as_deref()
                .unwrap_or(&existing.original_url);
            update.original_url = check_url(&mut errors, base, &supplied_utm);
            update.utm = Some(overlay_utm(&existing.utm, &supplied_utm));
        }

        if let Some(campaign_name) = req.campaign_name {
            let campaign_name = non_empty(campaign_name.as_deref()).map(String::from);
            check_label(
                &mut errors,
                "campaign_name",
                campaign_name.as_deref(),
                "Campaign name must be less than 255 characters",
            );
            update.campaign_name = Some(campaign_name);
        }
        if let Some(expires_at) = req.expires_at {
            update.expires_at = Some(check_expires_at(&mut errors, expires_at.as_deref()));
        }
        if let Some(max_clicks) = req.max_clicks {
            check_max_clicks(&mut errors, max_clicks);
            update.max_clicks = Some(max_clicks);
        }
        check_password(&mut errors, req.password.as_deref());
        check_utm(&mut errors, &supplied_utm);
        finish(errors)?;

        update.password_hash = process_update_password(req.password.as_deref())?;

        let link = self
            .links
            .update_link(link_id, owner_id, update)
            .await?
            .ok_or_else(|| LinkTrackerError::not_found("Link not found"))?;

        self.audit
            .record(
                SecurityAction::LinkUpdated,
                Some(owner_id),
                ctx,
                json!({ "linkId": link_id }),
            )
            .await;
        info!("LinkService: updated link '{}'", link_id);

        Ok(link)
    }

    pub async fn delete(&self, owner_id: &str, link_id: &str, ctx: &RequestContext) -> Result<()> {
        validate_link_id(link_id)?;
        if !self.links.delete_link(link_id, owner_id).await? {
            return Err(LinkTrackerError::not_found("Link not found"));
        }

        self.audit
            .record(
                SecurityAction::LinkDeleted,
                Some(owner_id),
                ctx,
                json!({ "linkId": link_id }),
            )
            .await;
        info!("LinkService: deleted link '{}'", link_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trackable_url() {
        assert_eq!(
            trackable_url("https://t.example.com/", "abc123"),
            "https://t.example.com/r/abc123"
        );
        assert_eq!(
            trackable_url("http://localhost:3000", "x"),
            "http://localhost:3000/r/x"
        );
    }

    #[test]
    fn test_validate_link_id_messages() {
        assert!(validate_link_id("abc_123-x").is_ok());
        assert_eq!(
            validate_link_id(&"a".repeat(21)).unwrap_err().message(),
            "Link ID must be between 1 and 20 characters"
        );
        assert_eq!(
            validate_link_id("a.b").unwrap_err().message(),
            "Link ID can only contain letters, numbers, hyphens, and underscores"
        );
    }

    #[test]
    fn test_update_request_distinguishes_null_from_missing() {
        let req: UpdateLinkRequest =
            serde_json::from_str(r#"{"campaign_name": null, "utm_source": "mail"}"#).unwrap();
        assert_eq!(req.campaign_name, Some(None));
        assert_eq!(req.expires_at, None);
        assert_eq!(req.utm.utm_source.as_deref(), Some("mail"));
    }

    #[test]
    fn test_overlay_utm_keeps_existing_values() {
        let existing = UtmParams {
            utm_source: Some("news".to_string()),
            utm_medium: Some("email".to_string()),
            ..Default::default()
        };
        let supplied = UtmParams {
            utm_medium: Some("social".to_string()),
            utm_term: Some("  ".to_string()),
            ..Default::default()
        };

        let merged = overlay_utm(&existing, &supplied);
        assert_eq!(merged.utm_source.as_deref(), Some("news"));
        assert_eq!(merged.utm_medium.as_deref(), Some("social"));
        assert_eq!(merged.utm_term, None);
    }

    #[test]
    fn test_field_checks_collect_every_error() {
        let mut errors = Vec::new();
        check_url(&mut errors, "ftp://example.com", &UtmParams::default());
        check_max_clicks(&mut errors, Some(0));
        check_password(&mut errors, Some("ab"));
        check_expires_at(&mut errors, Some("next week"));
        check_utm(
            &mut errors,
            &UtmParams {
                utm_medium: Some("m".repeat(256)),
                ..Default::default()
            },
        );

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["original_url", "max_clicks", "password", "expires_at", "utm_medium"]
        );
        assert_eq!(errors[4].message, "UTM medium must be less than 255 characters");
    }
}
