use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    commands::{staff::CreateStaffCommand, Command},
    common::{with_deadline, CurrentUser},
    errors::ServiceError,
    models::Staff,
    services::{
        pagination::{Page, PageQuery},
        ListingSettings,
    },
    store::{decode_rows, Filter, ListQuery, RecordStore, Sort, Table},
};

pub const STAFF_SEARCH_COLUMNS: [&str; 2] = ["name", "phone_number1"];

#[derive(Clone)]
pub struct StaffService {
    store: Arc<dyn RecordStore>,
    settings: ListingSettings,
}

impl StaffService {
    pub fn new(store: Arc<dyn RecordStore>, settings: ListingSettings) -> Self {
        Self { store, settings }
    }

    /// One page of staff, newest first.
    #[instrument(skip(self))]
    pub async fn list_staff(&self, query: PageQuery) -> Result<Page<Staff>, ServiceError> {
        let window = query.window(self.settings.default_page_size, self.settings.max_page_size)?;
        let filter = Filter::new().search(query.search.as_deref(), &STAFF_SEARCH_COLUMNS);
        let list = ListQuery::new(filter.clone())
            .sorted(Sort::desc("created_at"))
            .range(window.offset(), window.per_page);

        with_deadline(self.settings.deadline, async {
            let (total, rows) = tokio::try_join!(
                self.store.count(Table::Staff, &filter),
                self.store.list(Table::Staff, &list),
            )?;
            let staff: Vec<Staff> = decode_rows(Table::Staff, rows)?;
            debug!(total, returned = staff.len(), "Staff page listed");
            Ok::<_, ServiceError>(Page::new(staff, window, total))
        })
        .await
    }

    #[instrument(skip(self, command, actor))]
    pub async fn create_staff(&self, command: CreateStaffCommand, actor: &CurrentUser) -> Result<Staff, ServiceError> {
        command.execute(self.store.clone(), actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    fn form(name: &str, email: &str, phone: &str) -> CreateStaffCommand {
        CreateStaffCommand {
            name: name.into(),
            email_id: email.into(),
            phone_number1: phone.into(),
            phone_number2: None,
            gender: "female".into(),
            date_of_birth: "1990-05-17".into(),
            address: "4 Church Street".into(),
            pincode: "560001".into(),
        }
    }

    #[tokio::test]
    async fn lists_and_searches_staff() {
        let service = StaffService::new(Arc::new(MemoryStore::new()), ListingSettings::default());
        let actor = CurrentUser::new(Uuid::new_v4());
        service
            .create_staff(form("Lakshmi Rao", "lakshmi@salon.example", "9000000001"), &actor)
            .await
            .unwrap();
        service
            .create_staff(form("Priya Menon", "priya@salon.example", "9000000002"), &actor)
            .await
            .unwrap();

        let all = service.list_staff(PageQuery::default()).await.unwrap();
        assert_eq!(all.total, 2);

        let by_phone = service
            .list_staff(PageQuery::default().search("0002"))
            .await
            .unwrap();
        assert_eq!(by_phone.total, 1);
        assert_eq!(by_phone.items[0].name, "Priya Menon");
    }
}
