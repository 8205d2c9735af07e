//! 点击分析
//!
//! 纯聚合函数（`build_*`）只处理已经取回的数据；`AnalyticsService` 负责按 owner
//! 和时间窗口取数。

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use strum::{AsRefStr, EnumString};
use tracing::debug;

use crate::errors::{LinkTrackerError, Result};
use crate::storage::{ClickEvent, ClickStore, LinkStore, LinkSummary};
use crate::utils::csv_handler::to_csv_string;
use crate::utils::parse_iso8601;

/// 国家、来源排行保留的条数
pub const TOP_N: usize = 10;

pub const UNKNOWN_DEVICE: &str = "unknown";
pub const UNKNOWN_COUNTRY: &str = "Unknown";
pub const DIRECT_SOURCE: &str = "Direct";
pub const UNCATEGORIZED_CAMPAIGN: &str = "Uncategorized";

/// 统计时间窗口
///
/// `all` 以及无法识别的取值都回落到默认的 7 天
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
pub enum Period {
    #[strum(serialize = "1d")]
    OneDay,
    #[default]
    #[strum(serialize = "7d")]
    SevenDays,
    #[strum(serialize = "30d")]
    ThirtyDays,
    #[strum(serialize = "90d")]
    NinetyDays,
}

impl Period {
    pub fn from_token(token: Option<&str>) -> Self {
        token
            .and_then(|t| Period::from_str(t.trim()).ok())
            .unwrap_or_default()
    }

    pub fn days(self) -> i64 {
        match self {
            Period::OneDay => 1,
            Period::SevenDays => 7,
            Period::ThirtyDays => 30,
            Period::NinetyDays => 90,
        }
    }

    /// `[now - N 天, now]`
    pub fn window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - Duration::days(self.days()), now)
    }
}

// ============ Snapshot types ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub date: String,
    pub clicks: u64,
    pub unique_clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    pub device_type: String,
    pub clicks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryEntry {
    pub country: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub source: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignEntry {
    pub campaign: String,
    pub clicks: i64,
    pub unique_clicks: i64,
}

/// 与链接无关的分组统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClickBreakdown {
    pub timeline: Vec<TimelineEntry>,
    pub devices: Vec<DeviceEntry>,
    pub countries: Vec<CountryEntry>,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub active_links: u64,
    pub total_clicks: u64,
    pub unique_visitors: u64,
    pub unique_rate: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub summary: DashboardSummary,
    #[serde(flatten)]
    pub breakdown: ClickBreakdown,
    pub campaigns: Vec<CampaignEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkClickSummary {
    pub total_clicks: u64,
    pub unique_clicks: u64,
    pub unique_rate: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkAnalyticsSnapshot {
    pub summary: LinkClickSummary,
    #[serde(flatten)]
    pub breakdown: ClickBreakdown,
}

// ============ Pure aggregation ============

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 百分比，保留两位小数
///
/// 序列化为 `"66.67"` 形式的字符串；分母为 0 时序列化为数字 `0`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rate(Option<f64>);

impl Rate {
    pub fn of(part: u64, total: u64) -> Self {
        if total == 0 {
            return Self(None);
        }
        Self(Some(round2(part as f64 / total as f64 * 100.0)))
    }

    pub fn value(self) -> f64 {
        self.0.unwrap_or(0.0)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Some(value) => serializer.serialize_str(&format!("{:.2}", value)),
            None => serializer.serialize_u8(0),
        }
    }
}

/// `unique / total * 100`；total 为 0 时为 0
pub fn unique_rate(total: u64, unique: u64) -> Rate {
    Rate::of(unique, total)
}

fn label_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.is_empty()).unwrap_or(fallback)
}

/// 按首次出现顺序计数
fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, u64)> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut counts: Vec<(String, u64)> = Vec::new();

    for label in labels {
        match index.get(label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label, counts.len());
                counts.push((label.to_string(), 1));
            }
        }
    }
    counts
}

/// 降序（稳定排序，计数相同保持首次出现顺序）并截取前 `TOP_N`
fn top_n(mut counts: Vec<(String, u64)>) -> Vec<(String, u64)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_N);
    counts
}

pub fn build_timeline(clicks: &[ClickEvent]) -> Vec<TimelineEntry> {
    let mut days: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for click in clicks {
        let day = days
            .entry(click.clicked_at.format("%Y-%m-%d").to_string())
            .or_default();
        day.0 += 1;
        if click.is_unique {
            day.1 += 1;
        }
    }

    days.into_iter()
        .map(|(date, (clicks, unique_clicks))| TimelineEntry {
            date,
            clicks,
            unique_clicks,
        })
        .collect()
}

pub fn build_devices(clicks: &[ClickEvent], with_percentage: bool) -> Vec<DeviceEntry> {
    let total = clicks.len() as u64;
    tally(
        clicks
            .iter()
            .map(|c| label_or(c.device_type.as_deref(), UNKNOWN_DEVICE)),
    )
    .into_iter()
    .map(|(device_type, count)| DeviceEntry {
        device_type,
        clicks: count,
        percentage: with_percentage.then(|| Rate::of(count, total)),
    })
    .collect()
}

pub fn build_countries(clicks: &[ClickEvent]) -> Vec<CountryEntry> {
    top_n(tally(
        clicks
            .iter()
            .map(|c| label_or(c.country.as_deref(), UNKNOWN_COUNTRY)),
    ))
    .into_iter()
    .map(|(country, clicks)| CountryEntry { country, clicks })
    .collect()
}

pub fn build_sources(clicks: &[ClickEvent]) -> Vec<SourceEntry> {
    top_n(tally(
        clicks
            .iter()
            .map(|c| label_or(c.referrer.as_deref(), DIRECT_SOURCE)),
    ))
    .into_iter()
    .map(|(source, clicks)| SourceEntry { source, clicks })
    .collect()
}

/// 活动统计使用链接上持久化的计数器，与时间窗口无关
pub fn build_campaigns(links: &[LinkSummary]) -> Vec<CampaignEntry> {
    let mut campaigns: Vec<CampaignEntry> = links
        .iter()
        .map(|link| CampaignEntry {
            campaign: label_or(link.campaign_name.as_deref(), UNCATEGORIZED_CAMPAIGN).to_string(),
            clicks: link.total_clicks,
            unique_clicks: link.unique_clicks,
        })
        .collect();
    campaigns.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    campaigns
}

pub fn build_breakdown(clicks: &[ClickEvent], device_percentage: bool) -> ClickBreakdown {
    ClickBreakdown {
        timeline: build_timeline(clicks),
        devices: build_devices(clicks, device_percentage),
        countries: build_countries(clicks),
        sources: build_sources(clicks),
    }
}

fn count_unique(clicks: &[ClickEvent]) -> u64 {
    clicks.iter().filter(|c| c.is_unique).count() as u64
}

pub fn build_dashboard(links: &[LinkSummary], clicks: &[ClickEvent]) -> DashboardSnapshot {
    let total_clicks = clicks.len() as u64;
    let unique_visitors = count_unique(clicks);

    DashboardSnapshot {
        summary: DashboardSummary {
            active_links: links.len() as u64,
            total_clicks,
            unique_visitors,
            unique_rate: unique_rate(total_clicks, unique_visitors),
        },
        breakdown: build_breakdown(clicks, false),
        campaigns: build_campaigns(links),
    }
}

pub fn build_link_analytics(clicks: &[ClickEvent]) -> LinkAnalyticsSnapshot {
    let total_clicks = clicks.len() as u64;
    let unique_clicks = count_unique(clicks);

    LinkAnalyticsSnapshot {
        summary: LinkClickSummary {
            total_clicks,
            unique_clicks,
            unique_rate: unique_rate(total_clicks, unique_clicks),
        },
        breakdown: build_breakdown(clicks, true),
    }
}

// ============ Export ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// 导出请求（未解析的查询参数）
#[derive(Debug, Clone, Default)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub link_id: Option<String>,
    pub period: Option<String>,
}

/// 单条导出记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub clicked_at: DateTime<Utc>,
    pub link_id: String,
    pub original_url: String,
    pub campaign_name: Option<String>,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub referrer: Option<String>,
    pub is_unique: bool,
}

pub const CSV_HEADERS: [&str; 9] = [
    "Date", "Link", "Campaign", "IP", "Country", "Device", "Browser", "Referrer", "Unique",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    date: String,
    link: &'a str,
    campaign: &'a str,
    ip: &'a str,
    country: &'a str,
    device: &'a str,
    browser: &'a str,
    referrer: &'a str,
    unique: &'static str,
}

impl<'a> From<&'a ExportRow> for CsvRow<'a> {
    fn from(row: &'a ExportRow) -> Self {
        Self {
            date: row.clicked_at.to_rfc3339(),
            link: &row.original_url,
            campaign: row.campaign_name.as_deref().unwrap_or_default(),
            ip: row.ip_address.as_deref().unwrap_or_default(),
            country: row.country.as_deref().unwrap_or_default(),
            device: row.device_type.as_deref().unwrap_or_default(),
            browser: row.browser.as_deref().unwrap_or_default(),
            referrer: row.referrer.as_deref().unwrap_or_default(),
            unique: if row.is_unique { "Yes" } else { "No" },
        }
    }
}

pub fn rows_to_csv(rows: &[ExportRow]) -> Result<String> {
    let csv_rows: Vec<CsvRow<'_>> = rows.iter().map(CsvRow::from).collect();
    to_csv_string(&csv_rows, &CSV_HEADERS)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutput {
    Json(Vec<ExportRow>),
    Csv(String),
}

/// 校验后的导出参数
#[derive(Debug, Clone, PartialEq)]
pub struct ExportWindow {
    pub format: ExportFormat,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub link_id: Option<String>,
}

impl ExportQuery {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ExportWindow> {
        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => ExportFormat::default(),
            Some(raw) => ExportFormat::from_str(raw).map_err(|_| {
                LinkTrackerError::invalid_field("format", "Format must be either json or csv")
            })?,
        };

        let start = match self.start_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_iso8601(raw, false).ok_or_else(|| {
                LinkTrackerError::invalid_field("start_date", "Start date must be in ISO 8601 format")
            })?),
            None => None,
        };
        let end = match self.end_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_iso8601(raw, true).ok_or_else(|| {
                LinkTrackerError::invalid_field("end_date", "End date must be in ISO 8601 format")
            })?),
            None => None,
        };

        let (default_since, default_until) =
            Period::from_token(self.period.as_deref()).window(now);
        let since = start.unwrap_or(default_since);
        let until = end.unwrap_or(default_until);

        if since > until {
            return Err(LinkTrackerError::invalid_field(
                "start_date",
                "Start date cannot be after end date",
            ));
        }
        if since < now - Duration::days(365) {
            return Err(LinkTrackerError::invalid_field(
                "start_date",
                "Date range cannot exceed 1 year",
            ));
        }

        Ok(ExportWindow {
            format,
            since,
            until,
            link_id: self
                .link_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        })
    }
}

// ============ Service ============

#[derive(Clone)]
pub struct AnalyticsService {
    links: Arc<dyn LinkStore>,
    clicks: Arc<dyn ClickStore>,
}

impl AnalyticsService {
    pub fn new(links: Arc<dyn LinkStore>, clicks: Arc<dyn ClickStore>) -> Self {
        Self { links, clicks }
    }

    /// 跨链接总览；没有链接时直接返回空快照，不查询点击表
    pub async fn dashboard(&self, owner_id: &str, period: Period) -> Result<DashboardSnapshot> {
        let links = self.links.list_link_summaries(owner_id).await?;
        if links.is_empty() {
            return Ok(DashboardSnapshot::default());
        }

        let ids: Vec<String> = links.iter().map(|l| l.id.clone()).collect();
        let (since, until) = period.window(Utc::now());
        let clicks = self.clicks.clicks_in_window(&ids, since, until).await?;

        debug!(
            "Dashboard for {}: {} links, {} clicks in {}",
            owner_id,
            links.len(),
            clicks.len(),
            period.as_ref()
        );
        Ok(build_dashboard(&links, &clicks))
    }

    pub async fn link_analytics(
        &self,
        owner_id: &str,
        link_id: &str,
        period: Period,
    ) -> Result<LinkAnalyticsSnapshot> {
        let link = self
            .links
            .find_owned_link(link_id, owner_id)
            .await?
            .ok_or_else(|| LinkTrackerError::not_found("Link not found"))?;

        let (since, until) = period.window(Utc::now());
        let clicks = self
            .clicks
            .clicks_in_window(std::slice::from_ref(&link.id), since, until)
            .await?;

        Ok(build_link_analytics(&clicks))
    }

    pub async fn export(&self, owner_id: &str, query: &ExportQuery) -> Result<ExportOutput> {
        let window = query.validate(Utc::now())?;

        let mut links = self.links.list_link_summaries(owner_id).await?;
        if let Some(link_id) = window.link_id.as_deref() {
            links.retain(|l| l.id == link_id);
            if links.is_empty() {
                return Err(LinkTrackerError::not_found("Link not found"));
            }
        }

        let rows = if links.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<String> = links.iter().map(|l| l.id.clone()).collect();
            let by_id: HashMap<&str, &LinkSummary> =
                links.iter().map(|l| (l.id.as_str(), l)).collect();

            self.clicks
                .clicks_in_window(&ids, window.since, window.until)
                .await?
                .into_iter()
                .map(|click| {
                    let link = by_id.get(click.link_id.as_str());
                    ExportRow {
                        clicked_at: click.clicked_at,
                        original_url: link.map(|l| l.original_url.clone()).unwrap_or_default(),
                        campaign_name: link.and_then(|l| l.campaign_name.clone()),
                        link_id: click.link_id,
                        ip_address: click.ip_address,
                        country: click.country,
                        city: click.city,
                        device_type: click.device_type,
                        browser: click.browser,
                        operating_system: click.operating_system,
                        referrer: click.referrer,
                        is_unique: click.is_unique,
                    }
                })
                .collect()
        };

        match window.format {
            ExportFormat::Json => Ok(ExportOutput::Json(rows)),
            ExportFormat::Csv => rows_to_csv(&rows).map(ExportOutput::Csv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn click(
        link_id: &str,
        day: u32,
        unique: bool,
        device: Option<&str>,
        country: Option<&str>,
        referrer: Option<&str>,
    ) -> ClickEvent {
        ClickEvent {
            id: 0,
            link_id: link_id.to_string(),
            ip_address: None,
            user_agent: None,
            referrer: referrer.map(String::from),
            country: country.map(String::from),
            city: None,
            device_type: device.map(String::from),
            browser: None,
            operating_system: None,
            is_unique: unique,
            clicked_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
        }
    }

    fn summary(id: &str, campaign: Option<&str>, total: i64, unique: i64) -> LinkSummary {
        LinkSummary {
            id: id.to_string(),
            original_url: format!("https://example.com/{}", id),
            campaign_name: campaign.map(String::from),
            total_clicks: total,
            unique_clicks: unique,
            is_active: true,
        }
    }

    fn inactive(mut link: LinkSummary) -> LinkSummary {
        link.is_active = false;
        link
    }

    #[test]
    fn test_period_tokens() {
        assert_eq!(Period::from_token(Some("1d")), Period::OneDay);
        assert_eq!(Period::from_token(Some("90d")), Period::NinetyDays);
        assert_eq!(Period::from_token(Some("all")), Period::SevenDays);
        assert_eq!(Period::from_token(Some("bogus")), Period::SevenDays);
        assert_eq!(Period::from_token(None), Period::SevenDays);

        let now = Utc::now();
        let (since, until) = Period::ThirtyDays.window(now);
        assert_eq!(until, now);
        assert_eq!(until - since, Duration::days(30));
    }

    #[test]
    fn test_unique_rate() {
        assert_eq!(unique_rate(0, 0).value(), 0.0);
        assert_eq!(unique_rate(3, 2).value(), 66.67);
        assert_eq!(unique_rate(4, 4).value(), 100.0);
    }

    #[test]
    fn test_rate_serialization() {
        assert_eq!(serde_json::to_value(unique_rate(3, 2)).unwrap(), serde_json::json!("66.67"));
        assert_eq!(serde_json::to_value(unique_rate(4, 4)).unwrap(), serde_json::json!("100.00"));
        // 有点击但全是重复访问
        assert_eq!(serde_json::to_value(unique_rate(5, 0)).unwrap(), serde_json::json!("0.00"));
        assert_eq!(serde_json::to_value(unique_rate(0, 0)).unwrap(), serde_json::json!(0));
    }

    #[test]
    fn test_duplicate_visitor_scenario() {
        let clicks = vec![
            click("abc123", 1, true, Some("desktop"), None, None),
            click("abc123", 1, false, Some("desktop"), None, None),
            click("abc123", 2, true, Some("mobile"), None, None),
        ];

        let snapshot = build_link_analytics(&clicks);
        assert_eq!(snapshot.summary.total_clicks, 3);
        assert_eq!(snapshot.summary.unique_clicks, 2);
        assert_eq!(snapshot.summary.unique_rate.value(), 66.67);

        assert_eq!(snapshot.breakdown.devices[0].device_type, "desktop");
        assert_eq!(snapshot.breakdown.devices[0].percentage.map(Rate::value), Some(66.67));
        assert_eq!(snapshot.breakdown.devices[1].percentage.map(Rate::value), Some(33.33));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["summary"]["unique_rate"], serde_json::json!("66.67"));
        assert_eq!(json["devices"][1]["percentage"], serde_json::json!("33.33"));
    }

    #[test]
    fn test_timeline_sorted_without_gap_filling() {
        let clicks = vec![
            click("a", 5, true, None, None, None),
            click("a", 1, true, None, None, None),
            click("a", 5, false, None, None, None),
        ];

        let timeline = build_timeline(&clicks);
        assert_eq!(
            timeline,
            vec![
                TimelineEntry {
                    date: "2026-03-01".to_string(),
                    clicks: 1,
                    unique_clicks: 1,
                },
                TimelineEntry {
                    date: "2026-03-05".to_string(),
                    clicks: 2,
                    unique_clicks: 1,
                },
            ]
        );
    }

    #[test]
    fn test_countries_sorted_and_truncated() {
        let mut clicks = Vec::new();
        for (country, n) in [("US", 5), ("FR", 3), ("DE", 12)] {
            for _ in 0..n {
                clicks.push(click("a", 1, false, None, Some(country), None));
            }
        }

        let countries = build_countries(&clicks);
        let ranked: Vec<(&str, u64)> = countries
            .iter()
            .map(|c| (c.country.as_str(), c.clicks))
            .collect();
        assert_eq!(ranked, vec![("DE", 12), ("US", 5), ("FR", 3)]);

        let many: Vec<ClickEvent> = (0..15)
            .map(|i| click("a", 1, false, None, Some(&format!("C{}", i)), None))
            .collect();
        assert_eq!(build_countries(&many).len(), TOP_N);
    }

    #[test]
    fn test_fallback_labels() {
        let clicks = vec![
            click("a", 1, true, None, None, None),
            click("a", 1, true, Some(""), None, Some("")),
        ];

        let breakdown = build_breakdown(&clicks, false);
        assert_eq!(breakdown.devices.len(), 1);
        assert_eq!(breakdown.devices[0].device_type, UNKNOWN_DEVICE);
        assert_eq!(breakdown.devices[0].percentage, None);
        assert_eq!(breakdown.countries[0].country, UNKNOWN_COUNTRY);
        assert_eq!(breakdown.sources[0].source, DIRECT_SOURCE);
        assert_eq!(breakdown.sources[0].clicks, 2);
    }

    #[test]
    fn test_campaigns_use_persisted_counters() {
        let links = vec![
            summary("a", Some("spring"), 4, 3),
            inactive(summary("b", None, 10, 2)),
        ];
        // 时间窗口内只有一条点击，不影响活动统计
        let clicks = vec![click("a", 1, true, None, None, None)];

        let snapshot = build_dashboard(&links, &clicks);
        // 停用的链接同样计入
        assert_eq!(snapshot.summary.active_links, 2);
        assert_eq!(snapshot.summary.total_clicks, 1);
        assert_eq!(
            snapshot.campaigns,
            vec![
                CampaignEntry {
                    campaign: UNCATEGORIZED_CAMPAIGN.to_string(),
                    clicks: 10,
                    unique_clicks: 2,
                },
                CampaignEntry {
                    campaign: "spring".to_string(),
                    clicks: 4,
                    unique_clicks: 3,
                },
            ]
        );
    }

    #[test]
    fn test_empty_dashboard_serialization() {
        let json = serde_json::to_value(DashboardSnapshot::default()).unwrap();
        assert_eq!(json["summary"]["unique_rate"], serde_json::json!(0));
        assert_eq!(json["timeline"], serde_json::json!([]));
        assert_eq!(json["campaigns"], serde_json::json!([]));
        assert_eq!(json["sources"], serde_json::json!([]));
    }

    #[test]
    fn test_export_query_validation() {
        let now = Utc::now();

        let bad_format = ExportQuery {
            format: Some("xml".to_string()),
            ..Default::default()
        };
        assert_eq!(
            bad_format.validate(now).unwrap_err().message(),
            "Format must be either json or csv"
        );

        let bad_date = ExportQuery {
            start_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert_eq!(
            bad_date.validate(now).unwrap_err().message(),
            "Start date must be in ISO 8601 format"
        );

        let start = (now - Duration::days(2)).format("%Y-%m-%d").to_string();
        let end = (now - Duration::days(5)).format("%Y-%m-%d").to_string();
        let reversed = ExportQuery {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        };
        assert_eq!(
            reversed.validate(now).unwrap_err().message(),
            "Start date cannot be after end date"
        );

        let too_old = ExportQuery {
            start_date: Some((now - Duration::days(400)).to_rfc3339()),
            ..Default::default()
        };
        assert_eq!(
            too_old.validate(now).unwrap_err().message(),
            "Date range cannot exceed 1 year"
        );

        let ok = ExportQuery {
            period: Some("30d".to_string()),
            ..Default::default()
        }
        .validate(now)
        .unwrap();
        assert_eq!(ok.format, ExportFormat::Json);
        assert_eq!(ok.until - ok.since, Duration::days(30));
    }

    #[test]
    fn test_csv_rows() {
        let row = ExportRow {
            clicked_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
            link_id: "abc123".to_string(),
            original_url: "https://example.com/?a=1,2".to_string(),
            campaign_name: None,
            ip_address: Some("1.1.1.1".to_string()),
            country: Some("AU".to_string()),
            city: None,
            device_type: Some("mobile".to_string()),
            browser: Some("Safari".to_string()),
            operating_system: None,
            referrer: None,
            is_unique: true,
        };

        let csv = rows_to_csv(&[row]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Link,Campaign,IP,Country,Device,Browser,Referrer,Unique")
        );
        assert_eq!(
            lines.next(),
            Some("2026-03-01T08:30:00+00:00,\"https://example.com/?a=1,2\",,1.1.1.1,AU,mobile,Safari,,Yes")
        );
    }
}
