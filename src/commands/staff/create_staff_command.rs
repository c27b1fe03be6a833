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
    models::{Gender, Staff},
    store::{decode_row, encode_row, RecordStore, Table},
    validation::{
        require_date, require_gender, trimmed, trimmed_optional, validate_calendar_date,
        validate_gender, validate_pincode, FormSchema, ValidationReport,
    },
};

/// Staff form as submitted. Field names follow the `staff` columns; the
/// customer-style names are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStaffCommand {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub name: String,
    #[serde(alias = "email")]
    #[validate(email(message = "Please enter a valid email address."))]
    pub email_id: String,
    #[serde(alias = "phone1")]
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits."))]
    pub phone_number1: String,
    #[serde(default, alias = "phone2")]
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits."))]
    pub phone_number2: Option<String>,
    #[validate(custom = "validate_gender")]
    pub gender: String,
    #[serde(alias = "dob")]
    #[validate(custom = "validate_calendar_date")]
    pub date_of_birth: String,
    #[validate(length(min = 5, message = "Address must be at least 5 characters."))]
    pub address: String,
    #[validate(custom = "validate_pincode")]
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStaff {
    pub name: String,
    pub email_id: String,
    pub phone_number1: String,
    pub phone_number2: Option<String>,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub pincode: String,
}

impl FormSchema for CreateStaffCommand {
    type Output = NewStaff;

    fn normalized(self) -> Self {
        Self {
            name: trimmed(self.name),
            email_id: trimmed(self.email_id),
            phone_number1: trimmed(self.phone_number1),
            phone_number2: trimmed_optional(self.phone_number2),
            gender: trimmed(self.gender).to_lowercase(),
            date_of_birth: trimmed(self.date_of_birth),
            address: trimmed(self.address),
            pincode: trimmed(self.pincode),
        }
    }

    fn into_output(self) -> Result<NewStaff, ValidationReport> {
        Ok(NewStaff {
            gender: require_gender("gender", &self.gender)?,
            date_of_birth: require_date("date_of_birth", &self.date_of_birth)?,
            name: self.name,
            email_id: self.email_id,
            phone_number1: self.phone_number1,
            phone_number2: self.phone_number2,
            address: self.address,
            pincode: self.pincode,
        })
    }
}

#[async_trait]
impl Command for CreateStaffCommand {
    type Result = Staff;

    #[instrument(skip(self, store, actor), fields(owner = %actor.id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        actor: &CurrentUser,
    ) -> Result<Self::Result, ServiceError> {
        let staff = self.clone().check()?;

        let mut row = encode_row(Table::Staff, &staff)?;
        stamp_row(&mut row, actor, &Timestamp::now(), &["created_at", "updated_at"]);

        let stored = store.insert(Table::Staff, row).await?;
        let created: Staff = decode_row(Table::Staff, stored)?;

        info!(staff_id = created.id, "Staff member created");
        Ok(created)
    }
}
