use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    commands::{appointments::CreateAppointmentCommand, Command},
    common::{with_deadline, CurrentUser},
    errors::ServiceError,
    models::{Appointment, Service},
    services::{
        pagination::{Page, PageQuery},
        ListingSettings,
    },
    store::{decode_rows, Filter, ListQuery, RecordStore, Sort, Table},
};

pub const APPOINTMENT_SEARCH_COLUMNS: [&str; 2] = ["status", "appointment_time"];

/// A staff member as offered in the booking form's picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffOption {
    pub id: i64,
    pub name: String,
}

/// Everything the booking form lets the user choose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingOptions {
    pub services: Vec<Service>,
    pub staff: Vec<StaffOption>,
}

#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn RecordStore>,
    settings: ListingSettings,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn RecordStore>, settings: ListingSettings) -> Self {
        Self { store, settings }
    }

    /// Services and staff for the booking form, fetched concurrently.
    #[instrument(skip(self))]
    pub async fn booking_options(&self) -> Result<BookingOptions, ServiceError> {
        let by_name = ListQuery::all().sorted(Sort::asc("name"));

        with_deadline(self.settings.deadline, async {
            let (services, staff) = tokio::try_join!(
                self.store.list(Table::Services, &by_name),
                self.store.list(Table::Staff, &by_name),
            )?;
            Ok::<_, ServiceError>(BookingOptions {
                services: decode_rows(Table::Services, services)?,
                staff: decode_rows(Table::Staff, staff)?,
            })
        })
        .await
    }

    /// One page of appointments, latest date first, optionally for one customer.
    #[instrument(skip(self))]
    pub async fn list_appointments(
        &self,
        query: PageQuery,
        customer_id: Option<i64>,
    ) -> Result<Page<Appointment>, ServiceError> {
        let window = query.window(self.settings.default_page_size, self.settings.max_page_size)?;
        let mut filter = Filter::new().search(query.search.as_deref(), &APPOINTMENT_SEARCH_COLUMNS);
        if let Some(id) = customer_id {
            filter = filter.eq("customer_id", id);
        }
        let list = ListQuery::new(filter.clone())
            .sorted(Sort::desc("appointment_date"))
            .range(window.offset(), window.per_page);

        with_deadline(self.settings.deadline, async {
            let (total, rows) = tokio::try_join!(
                self.store.count(Table::Appointments, &filter),
                self.store.list(Table::Appointments, &list),
            )?;
            let appointments: Vec<Appointment> = decode_rows(Table::Appointments, rows)?;
            debug!(total, returned = appointments.len(), "Appointment page listed");
            Ok::<_, ServiceError>(Page::new(appointments, window, total))
        })
        .await
    }

    #[instrument(skip(self, command, actor))]
    pub async fn create_appointment(
        &self,
        command: CreateAppointmentCommand,
        actor: &CurrentUser,
    ) -> Result<Appointment, ServiceError> {
        command.execute(self.store.clone(), actor).await
    }
}
