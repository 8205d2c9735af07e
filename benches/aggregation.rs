//! 聚合与导出性能基准测试

use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use linktracker::services::analytics::{
    ExportRow, build_dashboard, build_link_analytics, rows_to_csv,
};
use linktracker::storage::{ClickEvent, LinkSummary};

const DEVICES: [&str; 4] = ["desktop", "mobile", "tablet", "bot"];
const COUNTRIES: [&str; 14] = [
    "US", "DE", "FR", "GB", "JP", "CN", "BR", "IN", "AU", "CA", "NL", "SE", "ES", "IT",
];

fn make_links(count: usize) -> Vec<LinkSummary> {
    (0..count)
        .map(|i| LinkSummary {
            id: format!("link{:04}", i),
            original_url: format!("https://example.com/{}", i),
            campaign_name: (i % 3 != 0).then(|| format!("campaign-{}", i % 7)),
            total_clicks: (i * 13) as i64,
            unique_clicks: (i * 7) as i64,
            is_active: i % 5 != 0,
        })
        .collect()
}

fn make_clicks(count: usize, links: usize) -> Vec<ClickEvent> {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| ClickEvent {
            id: i as i64,
            link_id: format!("link{:04}", i % links),
            ip_address: Some(format!("203.0.113.{}", i % 250)),
            user_agent: Some("bench".to_string()),
            referrer: (i % 4 != 0).then(|| format!("https://ref{}.example.org/", i % 25)),
            country: (i % 9 != 0).then(|| COUNTRIES[i % COUNTRIES.len()].to_string()),
            city: None,
            device_type: Some(DEVICES[i % DEVICES.len()].to_string()),
            browser: Some("Chrome".to_string()),
            operating_system: Some("Windows 10".to_string()),
            is_unique: i % 3 == 0,
            clicked_at: base - Duration::minutes((i * 7) as i64),
        })
        .collect()
}

fn to_export_rows(clicks: &[ClickEvent]) -> Vec<ExportRow> {
    clicks
        .iter()
        .map(|c| ExportRow {
            clicked_at: c.clicked_at,
            link_id: c.link_id.clone(),
            original_url: "https://example.com/landing?utm_source=bench".to_string(),
            campaign_name: Some("bench".to_string()),
            ip_address: c.ip_address.clone(),
            country: c.country.clone(),
            city: c.city.clone(),
            device_type: c.device_type.clone(),
            browser: c.browser.clone(),
            operating_system: c.operating_system.clone(),
            referrer: c.referrer.clone(),
            is_unique: c.is_unique,
        })
        .collect()
}

fn bench_dashboard(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics/dashboard");
    let links = make_links(200);

    for size in [1_000, 10_000, 100_000] {
        let clicks = make_clicks(size, links.len());
        group.bench_with_input(BenchmarkId::from_parameter(size), &clicks, |b, clicks| {
            b.iter(|| black_box(build_dashboard(&links, clicks)));
        });
    }

    group.finish();
}

fn bench_link_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics/link");

    for size in [1_000, 10_000] {
        let clicks = make_clicks(size, 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &clicks, |b, clicks| {
            b.iter(|| black_box(build_link_analytics(clicks)));
        });
    }

    group.finish();
}

fn bench_csv_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics/csv_export");

    for size in [1_000, 10_000] {
        let rows = to_export_rows(&make_clicks(size, 50));
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| black_box(rows_to_csv(rows).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dashboard, bench_link_analytics, bench_csv_export);
criterion_main!(benches);
