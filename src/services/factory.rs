use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{
        analytics::AnalyticsService, appointments::AppointmentService, customers::CustomerService,
        projection::PageProjector, staff::StaffService, ListingSettings,
    },
    store::RecordStore,
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    store: Arc<dyn RecordStore>,
    config: AppConfig,
}

impl ServiceFactory {
    /// Creates a new service factory with the given dependencies
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        Self { store, config }
    }

    fn listing_settings(&self) -> ListingSettings {
        ListingSettings::from(&self.config)
    }

    pub fn projector(&self) -> PageProjector {
        PageProjector::new(self.store.clone())
            .with_strategy(self.config.projection_strategy())
            .with_concurrency(self.config.projection_concurrency)
    }

    pub fn analytics_service(&self) -> AnalyticsService {
        AnalyticsService::from_config(self.store.clone(), &self.config)
    }

    pub fn customer_service(&self) -> CustomerService {
        CustomerService::new(self.store.clone(), self.projector(), self.listing_settings())
    }

    pub fn staff_service(&self) -> StaffService {
        StaffService::new(self.store.clone(), self.listing_settings())
    }

    pub fn appointment_service(&self) -> AppointmentService {
        AppointmentService::new(self.store.clone(), self.listing_settings())
    }

    /// Gets a reference to the row store
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub analytics: Arc<AnalyticsService>,
    pub customers: Arc<CustomerService>,
    pub staff: Arc<StaffService>,
    pub appointments: Arc<AppointmentService>,
}

impl ServiceContainer {
    /// Creates a new service container with all services initialized
    pub fn new(factory: &ServiceFactory) -> Self {
        Self {
            analytics: Arc::new(factory.analytics_service()),
            customers: Arc::new(factory.customer_service()),
            staff: Arc::new(factory.staff_service()),
            appointments: Arc::new(factory.appointment_service()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProjectionStrategy;
    use crate::store::MemoryStore;

    #[test]
    fn projector_follows_config() {
        let mut config = AppConfig::new("sqlite::memory:".into(), "test".into());
        config.projection_strategy = "fan-out".into();
        let factory = ServiceFactory::new(Arc::new(MemoryStore::new()), config);

        assert_eq!(factory.projector().strategy(), ProjectionStrategy::FanOut);
        let _container = ServiceContainer::new(&factory);
    }
}
