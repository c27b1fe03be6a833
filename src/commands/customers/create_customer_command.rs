use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    commands::{stamp_row, Command},
    common::{CurrentUser, Timestamp},
    errors::ServiceError,
    models::{Customer, Gender},
    store::{decode_row, encode_row, RecordStore, Table},
    validation::{
        require_date, require_gender, trimmed, trimmed_optional, validate_calendar_date,
        validate_gender, validate_pincode, FormSchema, ValidationReport,
    },
};

/// Customer form as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCustomerCommand {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits."))]
    pub phone1: String,
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits."))]
    #[serde(default)]
    pub phone2: Option<String>,
    #[validate(custom = "validate_gender")]
    pub gender: String,
    #[validate(custom = "validate_calendar_date")]
    pub dob: String,
    #[validate(custom = "validate_calendar_date")]
    #[serde(default)]
    pub anniversary_date: Option<String>,
    #[validate(length(min = 5, message = "Address must be at least 5 characters."))]
    pub address: String,
    #[validate(custom = "validate_pincode")]
    pub pincode: String,
}

/// A validated customer, shaped as the `customers` columns it fills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone1: String,
    pub phone2: Option<String>,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub anniversary_date: Option<NaiveDate>,
    pub address: String,
    pub pincode: String,
}

impl FormSchema for CreateCustomerCommand {
    type Output = NewCustomer;

    fn normalized(self) -> Self {
        Self {
            name: trimmed(self.name),
            email: trimmed(self.email),
            phone1: trimmed(self.phone1),
            phone2: trimmed_optional(self.phone2),
            gender: trimmed(self.gender).to_lowercase(),
            dob: trimmed(self.dob),
            anniversary_date: trimmed_optional(self.anniversary_date),
            address: trimmed(self.address),
            pincode: trimmed(self.pincode),
        }
    }

    fn into_output(self) -> Result<NewCustomer, ValidationReport> {
        let anniversary_date = match self.anniversary_date.as_deref() {
            Some(raw) => Some(require_date("anniversary_date", raw)?),
            None => None,
        };
        Ok(NewCustomer {
            gender: require_gender("gender", &self.gender)?,
            dob: require_date("dob", &self.dob)?,
            anniversary_date,
            name: self.name,
            email: self.email,
            phone1: self.phone1,
            phone2: self.phone2,
            address: self.address,
            pincode: self.pincode,
        })
    }
}

#[async_trait]
impl Command for CreateCustomerCommand {
    type Result = Customer;

    #[instrument(skip(self, store, actor), fields(owner = %actor.id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        actor: &CurrentUser,
    ) -> Result<Self::Result, ServiceError> {
        let customer = self.clone().check()?;

        let mut row = encode_row(Table::Customers, &customer)?;
        stamp_row(
            &mut row,
            actor,
            &Timestamp::now(),
            &["created_at", "updated_at", "last_activity_at"],
        );

        let stored = store.insert(Table::Customers, row).await?;
        let created: Customer = decode_row(Table::Customers, stored)?;

        info!(customer_id = created.id, "Customer created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn form() -> CreateCustomerCommand {
        CreateCustomerCommand {
            name: "  Kavya Rao ".into(),
            email: "kavya@example.com".into(),
            phone1: "9876543210".into(),
            phone2: Some("   ".into()),
            gender: "Female".into(),
            dob: "1994-08-21".into(),
            anniversary_date: None,
            address: "4th Cross, Indiranagar".into(),
            pincode: "560038".into(),
        }
    }

    #[test]
    fn normalizes_before_output() {
        let customer = form().check().unwrap();
        assert_eq!(customer.name, "Kavya Rao");
        assert_eq!(customer.phone2, None);
        assert_eq!(customer.gender, Gender::Female);
        assert_eq!(customer.dob, NaiveDate::from_ymd_opt(1994, 8, 21).unwrap());
    }

    #[test]
    fn reports_every_bad_field() {
        let mut bad = form();
        bad.name = "K".into();
        bad.email = "not-an-email".into();
        bad.phone1 = "12345".into();
        bad.phone2 = Some("555".into());
        bad.dob = "21/08/1994".into();
        bad.address = "Blr".into();
        bad.pincode = "5600".into();

        let report = bad.check().unwrap_err();
        assert_eq!(
            report.fields(),
            vec!["address", "dob", "email", "name", "phone1", "phone2", "pincode"]
        );
    }

    #[test]
    fn bad_anniversary_is_reported_only_when_present() {
        let mut with_date = form();
        with_date.anniversary_date = Some("2019-02-30".into());
        assert!(with_date.check().unwrap_err().has_field("anniversary_date"));

        let mut blank = form();
        blank.anniversary_date = Some("".into());
        assert_eq!(blank.check().unwrap().anniversary_date, None);
    }

    #[tokio::test]
    async fn execute_stamps_owner_and_timestamps() {
        let store = Arc::new(MemoryStore::new());
        let actor = CurrentUser::new(Uuid::new_v4());

        let created = form().execute(store.clone(), &actor).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.owner_id, Some(actor.id));
        assert!(created.updated_at.is_some());
        assert_eq!(created.last_activity_at, Some(created.created_at));
        assert_eq!(store.len(Table::Customers), 1);
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let mut bad = form();
        bad.pincode = "12345".into();

        let result = bad.execute(store.clone(), &CurrentUser::new(Uuid::new_v4())).await;

        assert_matches!(result, Err(ServiceError::ValidationError(report)) if report.has_field("pincode"));
        assert!(store.is_empty(Table::Customers));
    }
}
