// src/analytics_log/mod.rs

mod model;
mod store;

pub use model::AnalyticsEvent;

pub use store::AnalyticsLog;
