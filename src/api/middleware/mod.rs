pub mod auth;
pub mod request_id;

pub use auth::BearerAuth;
pub use request_id::{RequestId, assign_request_id};
