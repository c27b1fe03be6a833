use std::time::Duration;

use crate::config::AppConfig;

// Dashboard aggregation
pub mod analytics;

// Table screens
pub mod appointments;
pub mod customers;
pub mod pagination;
pub mod projection;
pub mod staff;

// Service factory for dependency injection
pub mod factory;

pub use analytics::AnalyticsService;
pub use appointments::AppointmentService;
pub use customers::CustomerService;
pub use factory::{ServiceContainer, ServiceFactory};
pub use pagination::{Page, PageQuery};
pub use projection::{PageProjector, ProjectionStrategy};
pub use staff::StaffService;

/// Paging limits and the deadline shared by the listing services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub deadline: Duration,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            deadline: Duration::from_secs(15),
        }
    }
}

impl From<&AppConfig> for ListingSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            default_page_size: cfg.default_page_size,
            max_page_size: cfg.max_page_size,
            deadline: cfg.query_timeout(),
        }
    }
}
