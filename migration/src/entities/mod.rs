pub mod link_click;
pub mod security_log;
pub mod tracked_link;

pub use link_click::Entity as LinkClickEntity;
pub use security_log::Entity as SecurityLogEntity;
pub use tracked_link::Entity as TrackedLinkEntity;
