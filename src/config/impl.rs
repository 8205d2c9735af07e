use std::sync::{Arc, OnceLock};

use super::StaticConfig;

static CONFIG: OnceLock<Arc<StaticConfig>> = OnceLock::new();

/// 未初始化时返回 None（错误渲染、测试等场景）
pub fn try_get_config() -> Option<Arc<StaticConfig>> {
    CONFIG.get().cloned()
}

/// Initialize the global configuration
///
/// Loads configuration from `path` (default "config.toml").
/// If the file doesn't exist, uses in-memory defaults.
pub fn init_config(path: Option<&str>) -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| Arc::new(StaticConfig::load(path)))
        .clone()
}
