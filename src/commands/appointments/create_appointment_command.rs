use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use crate::{
    commands::{stamp_row, Command},
    common::{round_currency, CurrentUser, Timestamp},
    errors::ServiceError,
    models::{Appointment, AppointmentStatus, ServiceAssignment},
    store::{decode_row, encode_row, RecordStore, Table},
    validation::{
        parse_clock_time, require_date, trimmed, trimmed_optional, validate_calendar_date,
        validate_clock_time, validate_non_negative_amount, FieldViolation, FormSchema,
        ValidationReport,
    },
};

/// Appointment booking form as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAppointmentCommand {
    #[validate(range(min = 1, message = "Select a customer."))]
    pub customer_id: i64,
    #[validate(
        length(min = 1, message = "Add at least one service."),
        custom = "validate_assignments"
    )]
    pub services: Vec<ServiceAssignment>,
    #[validate(custom = "validate_calendar_date")]
    pub appointment_date: String,
    #[validate(custom = "validate_clock_time")]
    pub appointment_time: String,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_amount")]
    pub advance_paid: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_cancelled: bool,
}

/// A validated appointment, shaped as the `appointments` columns it fills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAppointment {
    pub customer_id: i64,
    pub services: Vec<ServiceAssignment>,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub advance_paid: Decimal,
    pub status: AppointmentStatus,
    pub is_cancelled: bool,
    pub is_done: bool,
}

fn validate_assignments(services: &[ServiceAssignment]) -> Result<(), ValidationError> {
    if services.iter().all(|s| s.service_id > 0 && s.staff_id > 0) {
        Ok(())
    } else {
        let mut err = ValidationError::new("assignment");
        err.message = Some("Each service needs a service and a staff member.".into());
        Err(err)
    }
}

fn status_violation(message: &'static str) -> ValidationReport {
    ValidationReport::from_violations(vec![FieldViolation::new("status", "status", message)])
}

impl CreateAppointmentCommand {
    /// Status the row is stored with. Without an explicit status a booking
    /// is pending, or cancelled when flagged so.
    fn resolve_status(&self) -> Result<AppointmentStatus, ValidationReport> {
        let status = match self.status.as_deref() {
            None if self.is_cancelled => AppointmentStatus::Cancelled,
            None => AppointmentStatus::Pending,
            Some(raw) => raw.parse::<AppointmentStatus>().map_err(|_| {
                status_violation("Status must be one of confirmed, pending, cancelled")
            })?,
        };

        if (status == AppointmentStatus::Cancelled) != self.is_cancelled {
            return Err(status_violation(
                "Status must be cancelled exactly when the appointment is cancelled",
            ));
        }
        Ok(status)
    }
}

impl FormSchema for CreateAppointmentCommand {
    type Output = NewAppointment;

    fn normalized(self) -> Self {
        Self {
            appointment_date: trimmed(self.appointment_date),
            appointment_time: trimmed(self.appointment_time),
            status: trimmed_optional(self.status).map(|s| s.to_lowercase()),
            ..self
        }
    }

    fn into_output(self) -> Result<NewAppointment, ValidationReport> {
        let status = self.resolve_status()?;
        let appointment_date = require_date("appointment_date", &self.appointment_date)?;
        let appointment_time = parse_clock_time(&self.appointment_time)
            .map(|t| t.format("%H:%M").to_string())
            .ok_or_else(|| {
                ValidationReport::from_violations(vec![FieldViolation::new(
                    "appointment_time",
                    "time",
                    "Time must be in HH:MM format",
                )])
            })?;

        Ok(NewAppointment {
            customer_id: self.customer_id,
            services: self.services,
            appointment_date,
            appointment_time,
            advance_paid: round_currency(self.advance_paid),
            status,
            is_cancelled: self.is_cancelled,
            is_done: false,
        })
    }
}

#[async_trait]
impl Command for CreateAppointmentCommand {
    type Result = Appointment;

    #[instrument(skip(self, store, actor), fields(customer_id = self.customer_id, owner = %actor.id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        actor: &CurrentUser,
    ) -> Result<Self::Result, ServiceError> {
        let appointment = self.clone().check()?;

        let mut row = encode_row(Table::Appointments, &appointment)?;
        stamp_row(&mut row, actor, &Timestamp::now(), &["created_at"]);

        let stored = store.insert(Table::Appointments, row).await?;
        let created: Appointment = decode_row(Table::Appointments, stored)?;

        info!(appointment_id = created.id, status = %created.status, "Appointment booked");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use test_case::test_case;
    use uuid::Uuid;

    fn form() -> CreateAppointmentCommand {
        CreateAppointmentCommand {
            customer_id: 3,
            services: vec![ServiceAssignment {
                service_id: 1,
                staff_id: 2,
            }],
            appointment_date: "2024-07-12".into(),
            appointment_time: "9:05".into(),
            advance_paid: dec!(200),
            status: None,
            is_cancelled: false,
        }
    }

    #[test]
    fn defaults_to_pending_and_pads_time() {
        let appt = form().check().unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.appointment_time, "09:05");
        assert!(!appt.is_done);
    }

    #[test_case(Some("confirmed"), false, true ; "confirmed booking")]
    #[test_case(Some("Cancelled"), true, true ; "cancelled with flag")]
    #[test_case(Some("cancelled"), false, false ; "cancelled without flag")]
    #[test_case(Some("pending"), true, false ; "flag without cancelled status")]
    #[test_case(Some("rescheduled"), false, false ; "unknown status")]
    #[test_case(None, true, true ; "flag alone")]
    fn status_consistency(status: Option<&str>, is_cancelled: bool, ok: bool) {
        let mut cmd = form();
        cmd.status = status.map(str::to_string);
        cmd.is_cancelled = is_cancelled;
        match cmd.check() {
            Ok(_) => assert!(ok),
            Err(report) => {
                assert!(!ok);
                assert_eq!(report.fields(), vec!["status"]);
            }
        }
    }

    #[test]
    fn empty_services_and_bad_pairs_rejected() {
        let mut none = form();
        none.services.clear();
        assert!(none.check().unwrap_err().has_field("services"));

        let mut unassigned = form();
        unassigned.services[0].staff_id = 0;
        assert!(unassigned.check().unwrap_err().has_field("services"));
    }

    #[test]
    fn scalar_rules() {
        let mut cmd = form();
        cmd.customer_id = 0;
        cmd.advance_paid = dec!(-50);
        cmd.appointment_time = "half past nine".into();
        cmd.appointment_date = "12-07-2024".into();
        let report = cmd.check().unwrap_err();
        assert_eq!(
            report.fields(),
            vec!["advance_paid", "appointment_date", "appointment_time", "customer_id"]
        );
    }

    #[tokio::test]
    async fn execute_persists_service_pairs() {
        let store = Arc::new(MemoryStore::new());
        let actor = CurrentUser::new(Uuid::new_v4());
        let mut cmd = form();
        cmd.services.push(ServiceAssignment {
            service_id: 4,
            staff_id: 2,
        });

        let created = cmd.execute(store, &actor).await.unwrap();

        assert_eq!(created.services.len(), 2);
        assert_eq!(created.advance_paid, Some(dec!(200)));
        assert_eq!(created.owner_id, Some(actor.id));
        assert!(created.created_at.is_some());
    }
}
