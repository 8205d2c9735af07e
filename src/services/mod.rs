//! Service layer
//!
//! 业务逻辑只依赖 `storage` 中的 trait，HTTP 层通过这里的服务完成编排。

pub mod analytics;
pub mod click_recorder;
pub mod enrichment;
pub mod geoip;
pub mod identity;
pub mod link_service;
pub mod policy;
pub mod security_log;
pub mod user_agent;

pub use analytics::{AnalyticsService, Period};
pub use click_recorder::{ClickRecorder, RecordedClick};
pub use enrichment::{ClickEnricher, RequestContext};
pub use geoip::{GeoInfo, GeoIpLookup, GeoIpProvider};
pub use identity::{AuthenticatedUser, IdentityVerifier, JwtIdentityVerifier};
pub use link_service::LinkService;
pub use policy::PolicyOutcome;
pub use security_log::{SecurityAction, SecurityLogService};
pub use user_agent::{UserAgentInfo, UserAgentParser, WootheeParser};
