//! HTTP API handlers for pdscreen

pub mod analyze;
pub mod health;
pub mod passage;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use passage::passage_routes;
