//! User-Agent → 设备类型 / 浏览器 / 操作系统

use woothee::parser::Parser;

/// 无法识别设备类型时的默认值
pub const DEFAULT_DEVICE_TYPE: &str = "desktop";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
}

/// UA 解析器；任何满足此签名的实现都可以替换默认的 woothee 解析
pub trait UserAgentParser: Send + Sync {
    /// 无法解析时返回 None
    fn parse(&self, user_agent: &str) -> Option<UserAgentInfo>;
}

#[derive(Default)]
pub struct WootheeParser {
    parser: Parser,
}

impl WootheeParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != "UNKNOWN").then(|| value.to_string())
}

/// woothee category → 设备类型
fn classify_device(category: &str, os: &str) -> Option<&'static str> {
    match category {
        "smartphone" if os == "iPad" => Some("tablet"),
        "smartphone" | "mobilephone" => Some("mobile"),
        "appliance" => Some("console"),
        "crawler" => Some("bot"),
        "pc" => Some("desktop"),
        _ => None,
    }
}

impl UserAgentParser for WootheeParser {
    fn parse(&self, user_agent: &str) -> Option<UserAgentInfo> {
        let result = self.parser.parse(user_agent)?;

        Some(UserAgentInfo {
            device_type: classify_device(result.category, result.os).map(String::from),
            browser: known(result.name),
            operating_system: known(result.os),
        })
    }
}

/// 解析 UA，设备类型缺省为 "desktop"
pub fn describe_user_agent(parser: &dyn UserAgentParser, user_agent: Option<&str>) -> UserAgentInfo {
    let mut info = user_agent
        .filter(|ua| !ua.is_empty())
        .and_then(|ua| parser.parse(ua))
        .unwrap_or_default();

    if info.device_type.is_none() {
        info.device_type = Some(DEFAULT_DEVICE_TYPE.to_string());
    }
    info
}
