pub mod analytics;
pub mod health;
pub mod links;
pub mod redirect;
pub mod routes;
pub mod security;

pub use analytics::AnalyticsHandlers;
pub use health::HealthService;
pub use links::LinkHandlers;
pub use redirect::RedirectService;
pub use routes::configure_routes;
pub use security::SecurityHandlers;
