pub mod backend;
pub mod models;
pub mod store;

pub use backend::SeaOrmStorage;
pub use models::*;
pub use store::{ClickStore, LinkStore, SecurityLogStore};
