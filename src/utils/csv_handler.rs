//! CSV 导出

use csv::WriterBuilder;
use serde::Serialize;

use crate::errors::{LinkTrackerError, Result};

/// 把可序列化的行写成带表头的 CSV 文本
///
/// 表头由调用方给出，与行字段一一对应；没有数据行时只输出表头。
pub fn to_csv_string<T: Serialize>(rows: &[T], headers: &[&str]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LinkTrackerError::export(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| LinkTrackerError::export(e.to_string()))
}
