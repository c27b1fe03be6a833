//! Salon Ledger Library
//!
//! Metrics aggregation and tabular queries for a salon back office:
//! dashboard counts and distributions, customer pages with purchase and
//! visit metrics, and validated writes, all over a pluggable row store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod common;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

use std::sync::Arc;
use tracing::info;

use crate::errors::ServiceError;
use crate::services::{ServiceContainer, ServiceFactory};
use crate::store::{RecordStore, SeaOrmStore};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub store: Arc<dyn RecordStore>,
    pub services: ServiceContainer,
}

impl AppState {
    /// Wires every service onto an existing store.
    pub fn with_store(config: config::AppConfig, store: Arc<dyn RecordStore>) -> Self {
        let factory = ServiceFactory::new(store.clone(), config.clone());
        Self {
            services: ServiceContainer::new(&factory),
            config,
            store,
        }
    }

    /// Connects to the configured database and wires every service onto it.
    pub async fn connect(config: config::AppConfig) -> Result<Self, ServiceError> {
        let db = db::connect(&db::DbConfig::from(&config)).await?;
        info!(environment = %config.environment, "Row store connected");
        let store: Arc<dyn RecordStore> = Arc::new(SeaOrmStore::new(Arc::new(db)));
        Ok(Self::with_store(config, store))
    }

    pub fn analytics(&self) -> Arc<services::AnalyticsService> {
        self.services.analytics.clone()
    }

    pub fn customers(&self) -> Arc<services::CustomerService> {
        self.services.customers.clone()
    }

    pub fn staff(&self) -> Arc<services::StaffService> {
        self.services.staff.clone()
    }

    pub fn appointments(&self) -> Arc<services::AppointmentService> {
        self.services.appointments.clone()
    }
}

pub use common::CurrentUser;
pub use errors::StoreError;
